use std::{path::PathBuf, sync::Arc};

use chrono::Local;
use color_eyre::{Result, eyre::eyre};
use drugprice::{
    catalog::RecordId,
    export::{ExportArtifact, ExportAssembler, ExportError, batch_count},
    gateway::Gateway,
    query::{PageRequest, build},
};

use super::{FilterArgs, SortArgs};

pub enum Target {
    /// 1-based batch number as shown to users.
    Batch { filters: FilterArgs, number: u64 },
    Ids(Vec<RecordId>),
}

pub struct Options {
    pub target: Target,
    pub sort: SortArgs,
    pub out_dir: PathBuf,
}

pub async fn command(gateway: Arc<dyn Gateway>, options: Options) -> Result<()> {
    let assembler = ExportAssembler::new(gateway.clone(), options.out_dir);
    let sort = options.sort.spec();
    let result = match options.target {
        Target::Batch { filters, number } => {
            let config = filters.configuration()?;
            let descriptor = build(&config, sort, PageRequest::default());
            // The batch window needs the current match count.
            let total = gateway.fetch_page(&descriptor).await?.total_count;
            tracing::info!(total, available = batch_count(total), number, "Exporting batch");
            let index = number
                .checked_sub(1)
                .ok_or_else(|| eyre!("batch numbers start at 1"))?;
            assembler.export_batch(&descriptor, index, total).await
        }
        Target::Ids(ids) => {
            assembler
                .export_selection(&ids, sort, Local::now().naive_local())
                .await
        }
    };
    report(result)
}

fn report(result: Result<ExportArtifact, ExportError>) -> Result<()> {
    match result {
        Ok(artifact) => {
            println!("{}", artifact.summary());
            Ok(())
        }
        Err(err) if err.is_notice() => Err(eyre!("{err}")),
        Err(err) => Err(err.into()),
    }
}
