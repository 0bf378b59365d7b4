use clap::Parser;
use encrypto::cli::commands::generate::GenerateArgs;
use encrypto::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    encrypto::logging::init(cli.verbose);

    let result = match cli.command {
        None | Some(Commands::Shell) => encrypto::cli::commands::shell::execute(&cli),
        Some(Commands::Generate {
            length,
            min_lowercase,
            min_uppercase,
            min_digit,
            min_symbol,
        }) => encrypto::cli::commands::generate::execute(
            &cli,
            GenerateArgs {
                length,
                min_lowercase,
                min_uppercase,
                min_digit,
                min_symbol,
            },
        ),
        Some(Commands::Audit { last, ref since }) => {
            encrypto::cli::commands::audit_cmd::execute(&cli, last, since.as_deref())
        }
        Some(Commands::Completions { shell }) => {
            encrypto::cli::commands::completions::execute(shell)
        }
        Some(Commands::Version) => encrypto::cli::commands::version::execute(),
    };

    if let Err(e) = result {
        encrypto::cli::output::error(&e.to_string());
        if e.is_fatal() {
            encrypto::cli::output::tip(
                "The vault key or database is damaged or does not belong together; restore them from a backup.",
            );
        }
        std::process::exit(1);
    }
}
