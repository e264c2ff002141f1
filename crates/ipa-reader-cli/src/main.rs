//! Command-line interface for ipa-reader.
//!
//! Prints app metadata from IPA files and converts property lists between
//! the XML and binary formats.

use clap::{Parser, Subcommand, ValueEnum};
use ipa_reader::{bplist, plist_file, IpaFile, IpaReader, PlistFormat};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ipa-reader")]
#[command(about = "Inspect iOS app archives and binary property lists")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print app metadata from an IPA
    Info {
        /// IPA file
        ipa: PathBuf,

        /// Regex locating Info.plist inside the archive
        #[arg(long)]
        info_plist: Option<String>,

        /// Regex locating iTunesMetadata.plist inside the archive
        #[arg(long)]
        metadata: Option<String>,

        /// Container format of Info.plist
        #[arg(short, long, value_enum, default_value_t = FormatArg::Auto)]
        format: FormatArg,
    },

    /// Decode a property list and print it as XML
    Dump {
        /// Property list file
        file: PathBuf,

        #[arg(short, long, value_enum, default_value_t = FormatArg::Auto)]
        format: FormatArg,
    },

    /// Re-encode a property list as binary
    Convert {
        /// Source property list (binary or XML)
        input: PathBuf,

        /// Destination for the binary plist
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Auto,
    Binary,
    Xml,
}

impl From<FormatArg> for PlistFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Auto => PlistFormat::Auto,
            FormatArg::Binary => PlistFormat::Binary,
            FormatArg::Xml => PlistFormat::Xml,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Info {
            ipa,
            info_plist,
            metadata,
            format,
        } => {
            let mut reader = IpaReader::new().format(format.into());
            if let Some(pattern) = info_plist {
                reader = reader.info_plist_pattern(pattern);
            }
            if let Some(pattern) = metadata {
                reader = reader.metadata_pattern(pattern);
            }
            print_info(&reader.open(&ipa)?)?;
        }
        Command::Dump { file, format } => {
            let data = std::fs::read(&file)?;
            tracing::debug!(path = %file.display(), bytes = data.len(), "dumping plist");
            let value = plist_file::load(&data, format.into())?;
            let xml = plist_file::to_xml(&value)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&xml)?;
            writeln!(stdout)?;
        }
        Command::Convert { input, output } => {
            let data = std::fs::read(&input)?;
            tracing::debug!(path = %input.display(), bytes = data.len(), "converting plist");
            let value = plist_file::load(&data, PlistFormat::Auto)?;
            let encoded = bplist::encode(&value)?;
            std::fs::write(&output, &encoded)?;
            println!("Wrote {} bytes to {}", encoded.len(), output.display());
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_info(ipa: &IpaFile) -> Result<(), Box<dyn std::error::Error>> {
    let field = |label: &str, value: Option<&str>| {
        println!("{label:<20} {}", value.unwrap_or("-"));
    };

    field("Name", ipa.name()?);
    field("Bundle identifier", ipa.bundle_identifier()?);
    field("Version", ipa.version()?);
    field("Short version", ipa.short_version()?);
    field("Executable", ipa.executable_file()?);
    field("Minimum OS", ipa.minimum_os_version()?);
    field("Target OS", ipa.target_os_version()?);

    let families = ipa
        .device_family()?
        .into_iter()
        .map(|family| format!("{family:?}"))
        .collect::<Vec<_>>()
        .join(", ");
    field("Device family", Some(families.as_str()).filter(|s| !s.is_empty()));

    let schemes = ipa.url_schemes()?.join(", ");
    field("URL schemes", Some(schemes.as_str()).filter(|s| !s.is_empty()));
    field("Icon", ipa.icon_file()?.as_deref());
    field("Icon prerendered", Some(if ipa.icon_prerendered() { "yes" } else { "no" }));

    let provision = ipa.mobile_provision()?.map(|data| format!("{} bytes", data.len()));
    field("Provisioning", provision.as_deref());

    field("App ID", ipa.app_id()?.as_deref());
    field("Artist", ipa.artist_name()?);
    field("Artist ID", ipa.artist_id()?.as_deref());
    field("Genre", ipa.genre()?);
    field("Genre ID", ipa.genre_id()?.as_deref());
    let released = ipa.release_date()?.map(|date| date.to_string());
    field("Release date", released.as_deref());

    let names = ipa.localized_names()?;
    if !names.is_empty() {
        println!("Localized names:");
        for (locale, name) in names {
            println!("  {locale:<18} {name}");
        }
    }

    Ok(())
}
