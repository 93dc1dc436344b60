use color_eyre::Result;
use drugprice::{config::AiConfig, suggest::Suggester};

pub struct Options {
    pub ingredient: String,
    pub concentration: String,
    pub json: bool,
}

pub async fn command(config: &AiConfig, options: Options) -> Result<()> {
    let suggester = Suggester::from_config(config)?;
    let suggestion = suggester
        .suggest(&options.ingredient, &options.concentration)
        .await?;
    if options.json {
        println!("{}", serde_json::to_string_pretty(&suggestion)?);
        return Ok(());
    }
    for (n, drug) in suggestion.related_drugs.iter().enumerate() {
        println!("{}. {drug}", n + 1);
    }
    println!();
    println!("{}", suggestion.reasoning);
    Ok(())
}
