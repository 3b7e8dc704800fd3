use anyhow::Result;
use clap::{Parser, Subcommand};
use mingit::areas::repository::Repository;
use mingit::artifacts::core::page_or_print;

#[derive(Parser)]
#[command(
    name = "mingit",
    version = "0.1.0",
    about = "A minimal git-style object store and reference core",
    long_about = "A content-addressed object store with reference management, \
    tree diffing, commit-graph traversal and three-way merging. \
    Not a git replacement, the on-disk formats are its own.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Initialize a new repository")]
    Init {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<String>,
    },
    #[command(about = "Stage files for the next commit")]
    Add {
        #[arg(required = true, help = "Files or directories to stage")]
        paths: Vec<String>,
    },
    #[command(about = "Show the working tree status")]
    Status,
    #[command(about = "Create a new commit from the staging set")]
    Commit {
        #[arg(short, long, help = "The commit message")]
        message: String,
    },
    #[command(subcommand, about = "Create, list or delete branches")]
    Branch(BranchCommands),
    #[command(about = "Create an annotated tag, or list tags")]
    Tag {
        #[arg(index = 1, help = "The tag name; omit to list tags")]
        name: Option<String>,
        #[arg(short, long, help = "The commit to tag (defaults to HEAD)")]
        commit: Option<String>,
        #[arg(short, long, help = "The tag message")]
        message: Option<String>,
    },
    #[command(about = "Switch to another branch or commit")]
    Checkout {
        #[arg(index = 1, help = "Branch, tag or commit to check out")]
        target: String,
    },
    #[command(about = "Merge a branch into the current branch")]
    Merge {
        #[arg(index = 1, help = "Branch or commit to merge")]
        target: String,
        #[arg(short, long, help = "The merge commit message")]
        message: Option<String>,
    },
    #[command(about = "Show changes between commits or against the working tree")]
    Diff {
        #[arg(index = 1, help = "The older commit")]
        old: Option<String>,
        #[arg(index = 2, help = "The newer commit")]
        new: Option<String>,
        #[arg(short, long, help = "Only show these change kinds (A, D, M)")]
        filter: Option<String>,
    },
    #[command(about = "Show the commit history")]
    Log {
        #[arg(index = 1, help = "Revision to start from (defaults to HEAD)")]
        revision: Option<String>,
    },
    #[command(name = "format-patch", about = "Render commits as patch text")]
    FormatPatch {
        #[arg(required = true, help = "Revisions to render")]
        revisions: Vec<String>,
    },
}

#[derive(Subcommand)]
enum BranchCommands {
    #[command(about = "Create a new branch")]
    Create {
        #[arg(index = 1, help = "The branch name")]
        name: String,
        #[arg(short, long, help = "Revision to branch from (defaults to HEAD)")]
        from: Option<String>,
    },
    #[command(about = "Delete a branch")]
    Delete {
        #[arg(index = 1, help = "The branch name")]
        name: String,
    },
    #[command(about = "List branches")]
    List {
        #[arg(
            short,
            long,
            default_value = "all",
            help = "Which branches to list: local, remote or all"
        )]
        scope: String,
    },
}

fn open_repository() -> Result<Repository> {
    let pwd = std::env::current_dir()?;
    Repository::new(&pwd.to_string_lossy(), Box::new(std::io::stdout()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Init { path } => {
            let mut repository = match path {
                Some(path) => Repository::new(path, Box::new(std::io::stdout()))?,
                None => open_repository()?,
            };

            repository.init()?
        }
        Commands::Add { paths } => {
            let mut repository = open_repository()?;
            repository.add(paths).await?
        }
        Commands::Status => {
            let mut repository = open_repository()?;
            repository.print_status().await?
        }
        Commands::Commit { message } => {
            let mut repository = open_repository()?;
            repository.commit(message).await?;
        }
        Commands::Branch(action) => {
            let mut repository = open_repository()?;
            match action {
                BranchCommands::Create { name, from } => {
                    repository.branch_create(name, from.as_deref())?
                }
                BranchCommands::Delete { name } => repository.branch_delete(name)?,
                BranchCommands::List { scope } => {
                    let current = repository.current_branch()?;
                    for branch in repository.branches(scope)? {
                        let marker = if Some(&branch) == current.as_ref() {
                            "* "
                        } else {
                            "  "
                        };
                        println!("{marker}{branch}");
                    }
                }
            }
        }
        Commands::Tag {
            name,
            commit,
            message,
        } => {
            let mut repository = open_repository()?;
            match name {
                Some(name) => {
                    let tagged = repository.tag(name, commit.as_deref(), message.as_deref())?;
                    println!("tagged {}", tagged.to_short_oid());
                }
                None => {
                    for tag in repository.tags()? {
                        println!("{tag}");
                    }
                }
            }
        }
        Commands::Checkout { target } => {
            let mut repository = open_repository()?;
            repository.checkout(target).await?
        }
        Commands::Merge { target, message } => {
            let mut repository = open_repository()?;
            repository.merge(target, message.as_deref()).await?
        }
        Commands::Diff { old, new, filter } => {
            let mut repository = open_repository()?;
            let text = repository
                .diff(old.as_deref(), new.as_deref(), filter.as_deref())
                .await?;
            page_or_print(&text)?
        }
        Commands::Log { revision } => {
            let repository = open_repository()?;
            let text = repository.render_log(revision.as_deref())?;
            page_or_print(&text)?
        }
        Commands::FormatPatch { revisions } => {
            let repository = open_repository()?;
            let text = repository.format_patch(revisions)?;
            page_or_print(&text)?
        }
    }

    Ok(())
}
