use std::fs;

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use sip_assembly::{
    AssemblyConfig, AssemblyReport, DirectorySink, HashSpec, SipAssemblerBuilder, XmlPdiAssembler,
};
use sip_pack::{Compression, IndexEntry, SipReader};
use sip_types::PackagingInformation;

use crate::cli::*;
use crate::files;
use crate::verify;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Assemble(args) => cmd_assemble(args, &cli.format),
        Command::Inspect(args) => cmd_inspect(args, &cli.format),
        Command::Verify(args) => cmd_verify(args, &cli.format),
    }
}

fn cmd_assemble(args: AssembleArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let out = args.out.clone();
    let (report, files) = assemble(&args)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!(
                "{} Archived {} files into {} SIP(s) in {}",
                "✓".green().bold(),
                files.to_string().bold(),
                report.len().to_string().bold(),
                out.display()
            );
            for sip in &report.sips {
                println!(
                    "  {}  {} AIUs, {} objects, {} bytes  {}",
                    sip.dss_id.yellow(),
                    sip.metrics.num_aius(),
                    sip.metrics.num_digital_objects(),
                    sip.size,
                    sip.checksum[..16].dimmed()
                );
            }
        }
    }
    Ok(())
}

/// Build the configuration from `--config` and flags, then archive every
/// file under the source directory. Returns the report and the file count.
pub fn assemble(args: &AssembleArgs) -> anyhow::Result<(AssemblyReport, usize)> {
    let config = assembly_config(args)?;
    fs::create_dir_all(&args.out).with_context(|| format!("failed to create {}", args.out.display()))?;
    let source = fs::canonicalize(&args.source)
        .with_context(|| format!("failed to resolve {}", args.source.display()))?;
    let out = fs::canonicalize(&args.out)?;

    let records = files::collect(&source, Some(&out))?;
    tracing::info!(files = records.len(), source = %source.display(), "collected files");

    let mut sink = DirectorySink::create(&out)?;
    let mut assembler = SipAssemblerBuilder::from_config(&config, XmlPdiAssembler::new(files::fragment))
        .extraction(files::extract)
        .build();
    assembler.start(&mut sink)?;
    for record in &records {
        assembler
            .add(record)
            .with_context(|| format!("failed to archive {}", record.relative))?;
    }
    let report = assembler.end()?;
    Ok((report, records.len()))
}

fn assembly_config(args: &AssembleArgs) -> anyhow::Result<AssemblyConfig> {
    let mut config = match &args.config {
        Some(path) => AssemblyConfig::load(path)?,
        None => AssemblyConfig::new(default_packaging()),
    };

    let packaging = &mut config.packaging;
    let overrides = [
        (&mut packaging.application, &args.application),
        (&mut packaging.holding, &args.holding),
        (&mut packaging.producer, &args.producer),
        (&mut packaging.schema, &args.schema),
        (&mut packaging.dss_prefix, &args.dss_prefix),
    ];
    for (field, value) in overrides {
        if let Some(value) = value {
            *field = value.clone();
        }
    }

    let limits = &mut config.segmentation;
    limits.max_aius = args.max_aius.or(limits.max_aius);
    limits.max_digital_objects = args.max_digital_objects.or(limits.max_digital_objects);
    limits.max_pdi_size = args.max_pdi_size.or(limits.max_pdi_size);
    limits.max_digital_objects_size = args.max_digital_objects_size.or(limits.max_digital_objects_size);
    limits.max_sip_size = args.max_sip_size.or(limits.max_sip_size);

    if !args.hashes.is_empty() {
        config.hashing.hashes = args
            .hashes
            .iter()
            .map(|spec| parse_hash_spec(spec))
            .collect::<anyhow::Result<_>>()?;
    }
    if args.no_compression {
        config.container.compression = Compression::None;
    }
    Ok(config)
}

fn default_packaging() -> PackagingInformation {
    PackagingInformation {
        application: "fileApplication".into(),
        holding: "fileHolding".into(),
        producer: "sip-cli".into(),
        entity: "file".into(),
        schema: "urn:x-sip:file:1.0".into(),
        dss_prefix: "files-".into(),
        pdi_schema_version: "1.0".into(),
        priority: 0,
        base_retention_date: None,
    }
}

/// `FUNCTION:ENCODING`; the encoding defaults to base64.
fn parse_hash_spec(spec: &str) -> anyhow::Result<HashSpec> {
    let (function, encoding) = spec.split_once(':').unwrap_or((spec, "base64"));
    Ok(HashSpec {
        function: function.parse().with_context(|| format!("bad --hash {spec}"))?,
        encoding: encoding.parse().with_context(|| format!("bad --hash {spec}"))?,
    })
}

#[derive(Serialize)]
struct Inspection<'a> {
    file: String,
    size: u64,
    checksum: String,
    entries: &'a [IndexEntry],
}

fn cmd_inspect(args: InspectArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let reader = SipReader::open(&args.file).with_context(|| format!("failed to open {}", args.file.display()))?;
    match format {
        OutputFormat::Json => {
            let inspection = Inspection {
                file: args.file.display().to_string(),
                size: reader.size(),
                checksum: reader.checksum_hex(),
                entries: reader.entries(),
            };
            println!("{}", serde_json::to_string_pretty(&inspection)?);
        }
        OutputFormat::Text => {
            println!("{} ({} bytes)", args.file.display().to_string().bold(), reader.size());
            println!("  Checksum: {}", reader.checksum_hex().cyan());
            for entry in reader.entries() {
                println!(
                    "  {:<14} {:>12}  {:08x}  {}",
                    format!("{:?}", entry.kind),
                    entry.size,
                    entry.crc32,
                    entry.name
                );
            }
        }
    }
    Ok(())
}

fn cmd_verify(args: VerifyArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let results: Vec<_> = args.files.iter().map(|f| verify::verify_file(f)).collect();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Text => {
            for v in &results {
                if v.is_ok() {
                    println!(
                        "{} {}  {} objects, {} hashes verified",
                        "✓".green().bold(),
                        v.file.bold(),
                        v.digital_objects,
                        v.hashes_checked
                    );
                } else {
                    println!("{} {}", "✗".red().bold(), v.file.bold());
                    for problem in &v.problems {
                        println!("    {}", problem.red());
                    }
                }
            }
        }
    }
    let failed = results.iter().filter(|v| !v.is_ok()).count();
    if failed > 0 {
        bail!("{failed} of {} SIP(s) failed verification", results.len());
    }
    Ok(())
}
