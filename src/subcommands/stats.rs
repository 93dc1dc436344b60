use color_eyre::Result;
use drugprice::{
    export::format::{format_count, format_number},
    gateway::{Gateway, PriceStats},
    query::{PageRequest, SortSpec, build},
};

use super::FilterArgs;

pub struct Options {
    pub filters: FilterArgs,
    pub json: bool,
}

pub async fn command(gateway: &dyn Gateway, options: Options) -> Result<()> {
    let config = options.filters.configuration()?;
    let descriptor = build(&config, SortSpec::default(), PageRequest::default());
    let stats = gateway.fetch_aggregate_stats(&descriptor).await?;
    if options.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", describe(&stats));
    }
    Ok(())
}

pub fn describe(stats: &PriceStats) -> String {
    let price = |value: Option<f64>| value.map(format_number).unwrap_or_else(|| "-".to_string());
    let mut out = format!(
        "Số bản ghi: {}\nThấp nhất: {}\nCao nhất:  {}\nTrung bình: {}\nTrung vị:  {}\n",
        format_count(stats.total_count),
        price(stats.min),
        price(stats.max),
        price(stats.average),
        price(stats.median),
    );
    if let Some(record) = &stats.record_at_max {
        out.push_str(&format!(
            "Giá cao nhất: {} (TBMT {}, STT {})\n",
            record.drug_name, record.notice_id, record.id
        ));
    }
    if stats.capped {
        out.push_str(&format!(
            "Ước tính trên mẫu {} bản ghi\n",
            format_count(stats.sample_size as u64)
        ));
    }
    out
}
