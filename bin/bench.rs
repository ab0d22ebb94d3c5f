use clap::{Arg, ArgAction, Command};
use crc32fast::Hasher as Crc32;
use csv_async::{AsyncReaderBuilder, ByteRecord};
use csv_records::decode::{split_columns, tokenize_line};
use csv_records::CsvParser;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Instant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let matches = Command::new("bench")
        .arg(Arg::new("path").long("path").value_parser(clap::value_parser!(PathBuf)).required(true))
        .arg(Arg::new("no-headers").long("no-headers").help("Return bare rows instead of header-keyed records").action(ArgAction::SetTrue))
        .arg(Arg::new("verify").long("verify").help("Cross-check field counts against csv-async and print a CRC32 over fields").action(ArgAction::SetTrue))
        .arg(Arg::new("limit").long("limit").help("Stop verifying after N rows").value_parser(clap::value_parser!(u64)))
        .arg(Arg::new("fast-local").long("fast-local").help("Use the mmap path for local uncompressed files (feature: fast_local)").action(ArgAction::SetTrue))
        .get_matches();

    let path = matches.get_one::<PathBuf>("path").unwrap();
    let with_headers = !matches.get_flag("no-headers");

    let start = Instant::now();
    let mut parser = CsvParser::new();

    #[cfg(feature = "fast_local")]
    let mapped = if matches.get_flag("fast-local") {
        parser.from_path_mapped(path)?;
        true
    } else {
        false
    };
    #[cfg(not(feature = "fast_local"))]
    let mapped = false;

    if !mapped {
        parser.from_path(path).await?;
    }
    let acquired = start.elapsed().as_secs_f64();

    let parsed = parser.parse(with_headers);
    let elapsed = start.elapsed().as_secs_f64();
    let rps = (parsed.len() as f64) / elapsed;

    println!(
        "source={} encoding={} {}={}\nacquire={:.3}s total={:.3}s rows/sec={:.0}",
        path.display(),
        parser.source_encoding(),
        if with_headers { "records" } else { "rows" },
        parsed.len(),
        acquired,
        elapsed,
        rps
    );

    if matches.get_flag("verify") {
        let data = parser.data().unwrap_or_default();
        let limit = matches.get_one::<u64>("limit").copied();
        let (checked, mismatched, crc) = verify_fields(data, limit).await?;
        println!("verified={checked} mismatched={mismatched} crc=0x{crc:08x}");
    }
    Ok(())
}

/// Re-tokenize every row with csv-async and compare widths.
async fn verify_fields(data: &str, limit: Option<u64>) -> anyhow::Result<(u64, u64, u32)> {
    let mut crc = Crc32::new();
    let mut checked: u64 = 0;
    let mut mismatched: u64 = 0;
    let mut record = ByteRecord::new();

    for column in split_columns(data) {
        let ours = tokenize_line(column);

        let mut rdr = AsyncReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .create_reader(Cursor::new(column.as_bytes().to_vec()));
        let width = if rdr.read_byte_record(&mut record).await? {
            record.len()
        } else {
            // csv-async yields nothing for an empty line; we yield one empty field
            1
        };

        checked += 1;
        if width != ours.len() {
            mismatched += 1;
            tracing::debug!(row = checked, ours = ours.len(), theirs = width, "width mismatch");
        }
        // accumulate CRC32 over all fields separated by '\x1f' (unit separator)
        for (fi, field) in ours.iter().enumerate() {
            if fi > 0 {
                crc.update(&[0x1f]);
            }
            crc.update(field.as_bytes());
        }
        if let Some(lim) = limit {
            if checked >= lim {
                break;
            }
        }
    }
    Ok((checked, mismatched, crc.finalize()))
}
