// SPDX-License-Identifier: Apache-2.0

use crate::report_cli_error::report_anyhow_error_and_exit;
use bbcov::BlockCatalog;
use clap::ArgMatches;
use std::io::Write;
use std::path::Path;

fn catalog_dump(matches: &ArgMatches) -> anyhow::Result<()> {
    let path = matches
        .get_one::<String>("bb_info_log")
        .map(Path::new)
        .ok_or_else(|| anyhow::anyhow!("no block-metadata log given"))?;
    let catalog = BlockCatalog::from_path(path)?;

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    for (index, record) in catalog.iter() {
        let state = if record.is_corrupted() {
            "corrupted"
        } else {
            "ok"
        };
        writeln!(out, "{}\t{}\t{}", index, state, record.describe())?;
    }
    out.flush()?;
    Ok(())
}

pub fn handle_catalog(matches: &ArgMatches) {
    log::info!("handle_catalog");
    if let Err(e) = catalog_dump(matches) {
        report_anyhow_error_and_exit(&e, "catalog");
    }
}
