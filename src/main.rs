use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser as ClapParser, Subcommand, ValueEnum};
use combostorm::emit::{combo, forwarders, write_files};
use combostorm::enumerate::{enumerate, render_listing};
use combostorm::signature::{native_signatures, parse_table};
use combostorm::variant::Variant;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser, Debug)]
#[command(version, about = "Struct layout test generator")]
struct Args {
    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every enumerated layout.
    Layouts {
        #[command(flatten)]
        variant: VariantArgs,

        /// Print the layouts as RON instead of one per line.
        #[arg(long, default_value_t = false)]
        ron: bool,
    },

    /// Write the generated C tests into a directory.
    Tests {
        #[command(flatten)]
        variant: VariantArgs,

        #[arg(long)]
        out_dir: PathBuf,
    },

    /// Write the native forwarder header or source.
    Forwarders {
        kind: ForwarderKind,

        #[arg(long)]
        out: PathBuf,

        /// Signature table to read instead of the built-in one.
        #[arg(long)]
        table: Option<PathBuf>,
    },
}

#[derive(ClapArgs, Debug)]
struct VariantArgs {
    #[arg(long, value_enum, default_value_t = BuiltinVariant::Filc)]
    variant: BuiltinVariant,

    /// RON file describing a custom variant. Takes precedence over `--variant`.
    #[arg(long)]
    variant_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BuiltinVariant {
    Filc,
    Wide,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ForwarderKind {
    Header,
    Source,
}

impl VariantArgs {
    fn load(&self) -> Result<Variant> {
        let Some(path) = &self.variant_file else {
            return Ok(match self.variant {
                BuiltinVariant::Filc => Variant::filc(),
                BuiltinVariant::Wide => Variant::wide(),
            });
        };

        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read variant file {}", path.display()))?;

        Variant::from_ron(&source)
            .with_context(|| format!("failed to load variant from {}", path.display()))
    }
}

fn main() -> Result<()> {
    let Args { log_level, command } = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    match command {
        Command::Layouts { variant, ron } => {
            let variant = variant.load()?;
            let layouts = enumerate(&variant)?;

            if ron {
                let pretty = ron::ser::PrettyConfig::new();
                println!("{}", ron::ser::to_string_pretty(&layouts, pretty)?);
            } else {
                print!("{}", render_listing(&layouts));
            }
        }

        Command::Tests { variant, out_dir } => {
            let variant = variant.load()?;
            let layouts = enumerate(&variant)?;
            let files = combo::generate(&layouts, &variant)?;

            write_files(&out_dir, &files)
                .with_context(|| format!("failed to write tests to {}", out_dir.display()))?;

            info!(files = files.len(), out_dir = %out_dir.display(), "done");
        }

        Command::Forwarders { kind, out, table } => {
            let signatures = match &table {
                Some(path) => {
                    let source = fs::read_to_string(path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    parse_table(&source)
                        .with_context(|| format!("failed to parse {}", path.display()))?
                }
                None => native_signatures().context("built-in signature table is malformed")?,
            };

            let contents = match kind {
                ForwarderKind::Header => forwarders::emit_header(&signatures),
                ForwarderKind::Source => forwarders::emit_source(&signatures),
            };

            fs::write(&out, contents)
                .with_context(|| format!("failed to write {}", out.display()))?;
        }
    }

    Ok(())
}
