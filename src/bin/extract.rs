use anyhow::Result;
use finfacts::catalogue::ConceptCatalogue;
use finfacts::engine::ExtractionEngine;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "finfacts",
    about = "Extract concept time series from XBRL filing files"
)]
struct Opt {
    /// Concept catalogue JSON; the built-in catalogue is used when omitted
    #[structopt(long, parse(from_os_str))]
    catalogue: Option<std::path::PathBuf>,

    /// Restrict extraction to these concepts (default: whole catalogue)
    #[structopt(long)]
    concept: Vec<String>,

    /// Filing files: the instance document plus any auxiliary schema/label files
    #[structopt(parse(from_os_str), required = true)]
    files: Vec<std::path::PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let catalogue = match &opt.catalogue {
        Some(path) => ConceptCatalogue::from_file(path)?,
        None => ConceptCatalogue::builtin().clone(),
    };

    let mut files = Vec::new();
    for path in &opt.files {
        files.push(std::fs::read_to_string(path)?);
    }

    let engine = ExtractionEngine::new(&catalogue);
    let extraction = if opt.concept.is_empty() {
        engine.extract(&files)
    } else {
        let concepts: Vec<&str> = opt.concept.iter().map(String::as_str).collect();
        engine.extract_concepts(&files, &concepts)
    };

    match extraction {
        Ok(extraction) => {
            println!("{}", serde_json::to_string_pretty(&extraction)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error extracting filing: {}", e);
            std::process::exit(1);
        }
    }
}
