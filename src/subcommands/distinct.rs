use color_eyre::Result;
use drugprice::{catalog::Field, gateway::Gateway};

pub const DEFAULT_LIMIT: usize = 50;

pub struct Options {
    pub field: Field,
    pub limit: usize,
    pub json: bool,
}

pub async fn command(gateway: &dyn Gateway, options: Options) -> Result<()> {
    let values = gateway
        .fetch_distinct_values(options.field, options.limit)
        .await;
    if options.json {
        println!("{}", serde_json::to_string(&values)?);
        return Ok(());
    }
    for value in values {
        println!("{value}");
    }
    Ok(())
}
