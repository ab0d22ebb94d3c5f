use csv_records::CsvParser;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = Path::new("./data/sample.csv");
    let mut parser = CsvParser::new();
    parser.from_path(path).await?;

    let required = ["sku"];
    for record in parser.parse_records() {
        for header in required {
            let value = record
                .get(header)
                .ok_or_else(|| anyhow::anyhow!("missing {header}"))?;
            println!("{header}={value}");
        }
    }
    Ok(())
}
