use clap::Parser;
use std::path::PathBuf;

use quartermaster_core::{run, Category, ExpansionSettings};

#[derive(Debug, Parser)]
#[command(
    name = "quartermaster",
    version,
    about = "Generative content expansion for the mercenary RPG data files"
)]
struct Args {
    /// Categories to expand (weapons, armor, helmets, shields, backgrounds,
    /// events, quests). Defaults to all of them.
    categories: Vec<String>,

    /// Print the prompts instead of calling the model; no file is touched.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Directory holding the pipe-delimited data tables.
    #[arg(long, default_value = "csv")]
    data_dir: PathBuf,

    /// Structured source document receiving story and quest merges.
    #[arg(long, default_value = "constants.ts")]
    document: PathBuf,

    /// Key file consulted when GEMINI_API_KEY is not set.
    #[arg(long, default_value = "api_key.txt")]
    key_file: PathBuf,

    #[arg(long, default_value = "gemini-2.5-flash")]
    model: String,

    #[arg(long, default_value_t = 0.8)]
    temperature: f32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let categories = if args.categories.is_empty() {
        Category::ALL.to_vec()
    } else {
        let mut selected = Vec::new();
        for name in &args.categories {
            match Category::from_name(name) {
                Some(category) => selected.push(category),
                None => {
                    eprintln!(
                        "Unknown category '{}'. Known categories: {}",
                        name,
                        Category::ALL.map(Category::name).join(", "),
                    );
                    std::process::exit(1);
                }
            }
        }
        selected
    };

    let settings = ExpansionSettings {
        categories,
        data_dir: args.data_dir,
        document_path: args.document,
        key_file: args.key_file,
        model: args.model,
        temperature: args.temperature,
        dry_run: args.dry_run,
    };

    if let Err(err) = run(settings) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
