use clap::{Arg, Command};
use std::io::{self, Write};

fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("with_header")
                .long("with-header")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(Arg::new("cols").long("cols").default_value("3"))
        .arg(
            Arg::new("sep")
                .long("sep")
                .help("Row separator: newline, semicolon, or literal (backslash + n)")
                .value_parser(["newline", "semicolon", "literal"])
                .default_value("newline"),
        )
        .arg(
            Arg::new("quote")
                .long("quote")
                .help("Quote every value and embed a comma in it")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let rows: u64 = *matches.get_one("rows").unwrap();
    let with_header = matches.get_flag("with_header");
    let quote = matches.get_flag("quote");
    let cols: usize = matches.get_one::<String>("cols").unwrap().parse()?;
    let sep = match matches.get_one::<String>("sep").unwrap().as_str() {
        "semicolon" => ";",
        "literal" => "\\n",
        _ => "\n",
    };

    let mut out = io::BufWriter::new(io::stdout().lock());

    if with_header {
        write!(&mut out, "sku")?;
        for i in 1..cols {
            write!(&mut out, ",col{}", i)?;
        }
        write!(&mut out, "{sep}")?;
    }

    // Very simple deterministic data: sku, col1, col2, ...
    for i in 0..rows {
        if i > 0 {
            write!(&mut out, "{sep}")?;
        }
        write!(&mut out, "SKU{:010}", i)?;
        for c in 1..cols {
            if quote {
                write!(&mut out, ",\"v{}, {}\"", c, i)?;
            } else {
                write!(&mut out, ",v{}_{}", c, i)?;
            }
        }
        if i % 10_000 == 0 {
            out.flush()?;
        } // keep buffers moving on huge runs
    }

    out.flush()?;
    Ok(())
}
