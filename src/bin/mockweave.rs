use std::{env, fs, path::Path, path::PathBuf, process::ExitCode};

use mockweave::model::Module;
use mockweave::scanner::parse_module_in;
use mockweave::{generate, GenerateSpec, GeneratorContext, ModuleSetResolver, Recorder, SELF_MODULE};

#[derive(Debug)]
struct GenerateOptions {
    config: PathBuf,
    output: Option<PathBuf>,
    no_siblings: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    if args.len() < 3 {
        return Err("not enough arguments".to_string());
    }

    let command = args[1].as_str();
    let file = PathBuf::from(&args[2]);

    match command {
        "generate" => {
            let options = parse_generate_options(&args[3..])?;
            run_generate(&file, &options)
        }
        _ => Err(format!("unknown command '{command}'")),
    }
}

fn run_generate(file: &Path, options: &GenerateOptions) -> Result<(), String> {
    let specs = load_specs(&options.config)?;
    if specs.len() > 1 && options.output.is_some() {
        return Err("--output is only valid with a single-entry config".to_string());
    }

    let module = scan_unit(file, options.no_siblings)?;
    let mut resolver = ModuleSetResolver::new();
    resolver.register(SELF_MODULE, &module);
    let mut ctx = GeneratorContext::new();
    let recorder = Recorder::default();

    let out_dir = file.parent().unwrap_or(Path::new("."));

    for spec in &specs {
        let mut sink = Vec::new();
        let count = generate(&module, spec, &mut ctx, &resolver, &recorder, &mut sink)
            .map_err(|e| e.to_string())?;
        if count == 0 {
            eprintln!("{}: no declaration matched; nothing written", spec.name);
            continue;
        }

        let dest = match &options.output {
            Some(path) => path.clone(),
            None => out_dir.join(format!("mockweave_{}_test.go", spec.name)),
        };
        fs::write(&dest, &sink)
            .map_err(|e| format!("failed to write '{}': {e}", dest.display()))?;
        eprintln!("wrote: {} ({count} declarations)", dest.display());
    }

    Ok(())
}

/// Scans the target file and, unless disabled, every sibling `.go` file in
/// its directory into one merged module, so cross-file peers and callees
/// resolve the way the language's own build would see them.
fn scan_unit(file: &Path, no_siblings: bool) -> Result<Module, String> {
    let mut module = scan_file(file)?;

    if no_siblings {
        return Ok(module);
    }

    let dir = file.parent().unwrap_or(Path::new("."));
    let entries = fs::read_dir(dir)
        .map_err(|e| format!("failed to read directory '{}': {e}", dir.display()))?;
    let mut siblings: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| format!("failed to read directory entry: {e}"))?;
        let path = entry.path();
        if path == file || !path.is_file() {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.ends_with(".go") && !name.ends_with("_test.go") {
            siblings.push(path);
        }
    }
    siblings.sort();

    for path in siblings {
        let sibling = scan_file(&path)?;
        if sibling.package == module.package {
            module.merge(sibling);
        }
    }

    Ok(module)
}

fn scan_file(path: &Path) -> Result<Module, String> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {e}", path.display()))?;
    parse_module_in(&source, &path.display().to_string()).map_err(|e| e.to_string())
}

/// A config document is either one generation spec or an array of them.
fn load_specs(path: &Path) -> Result<Vec<GenerateSpec>, String> {
    let input = fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {e}", path.display()))?;
    let trimmed = input.trim_start();
    if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<GenerateSpec>>(&input)
            .map_err(|e| format!("config error: {e}"))
    } else {
        GenerateSpec::from_json(&input)
            .map(|spec| vec![spec])
            .map_err(|e| e.to_string())
    }
}

fn parse_generate_options(args: &[String]) -> Result<GenerateOptions, String> {
    let mut config: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut no_siblings = false;
    let mut i = 0usize;

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --config".to_string());
                }
                config = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--output" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --output".to_string());
                }
                output = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--no-siblings" => {
                no_siblings = true;
                i += 1;
            }
            other => return Err(format!("unknown option '{other}'")),
        }
    }

    let config =
        config.ok_or_else(|| "--config <spec.json> is required for generate".to_string())?;

    Ok(GenerateOptions {
        config,
        output,
        no_siblings,
    })
}

fn print_usage() {
    eprintln!("usage:");
    eprintln!("  mockweave generate <file.go> --config <spec.json> [--output <file>] [--no-siblings]");
    eprintln!();
    eprintln!("generate options:");
    eprintln!("  --config <spec.json>   generation spec (one object or an array of them)");
    eprintln!("  --output <file>        write to this file (single-entry configs only)");
    eprintln!("  --no-siblings          scan only the named file, not its package siblings");
}

#[cfg(test)]
mod tests {
    use super::parse_generate_options;

    #[test]
    fn parse_generate_requires_config() {
        let args = vec!["--no-siblings".to_string()];
        let err = parse_generate_options(&args).unwrap_err();
        assert!(err.contains("--config"));
    }

    #[test]
    fn parse_generate_all_options() {
        let args = vec![
            "--config".to_string(),
            "spec.json".to_string(),
            "--output".to_string(),
            "out.go".to_string(),
            "--no-siblings".to_string(),
        ];
        let opts = parse_generate_options(&args).unwrap();
        assert_eq!(opts.config.to_str().unwrap(), "spec.json");
        assert_eq!(opts.output.as_ref().unwrap().to_str().unwrap(), "out.go");
        assert!(opts.no_siblings);
    }

    #[test]
    fn parse_generate_option_values_required() {
        let args = vec!["--output".to_string()];
        let err = parse_generate_options(&args).unwrap_err();
        assert!(err.contains("missing value for --output"));
    }
}
