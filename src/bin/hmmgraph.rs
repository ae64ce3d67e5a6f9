use clap::{Parser, Subcommand};
use hmmgraph::prelude::*;
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Opts {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// show model type, states and transitions of a model file
    Inspect {
        file: PathBuf,
        /// also write the graph in graphviz dot
        #[clap(long)]
        dot: Option<PathBuf>,
    },
    /// create an empty model of the declared properties
    New {
        #[clap(long)]
        properties: PathBuf,
        #[clap(long)]
        output: PathBuf,
    },
    /// load a model file and save it again
    Roundtrip { input: PathBuf, output: PathBuf },
}

fn run(command: Command) -> Result<()> {
    let layer = JsonFileLayer::new();
    match command {
        Command::Inspect { file, dot } => {
            let hmm = Hmm::open(&file, &layer)?;
            print!("{}", hmm);
            if let Some(dot) = dot {
                hmmgraph::io::write_string(&dot, &hmm.to_dot())?;
            }
        }
        Command::New { properties, output } => {
            let properties = HmmProperties::from_json_file(&properties)?;
            info!("properties\n{}", properties);
            let hmm = Hmm::new(properties)?;
            hmm.save(&output, &layer)?;
        }
        Command::Roundtrip { input, output } => {
            let hmm = Hmm::open(&input, &layer)?;
            hmm.save(&output, &layer)?;
            println!(
                "# n_states={} n_transitions={}",
                hmm.n_states(),
                hmm.n_transitions()
            );
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let opts: Opts = Opts::parse();
    println!("# started_at={}", chrono::Local::now());
    println!("# opts={:?}", opts);

    if let Err(e) = run(opts.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }

    println!("# finished_at={}", chrono::Local::now());
}
