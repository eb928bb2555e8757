// Financebook CLI
// Every command prints its result as JSON on stdout.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};

use financebook::{Book, Config, NewPaymentItem, NewTagNode, PaymentFilter};

/// financebook - categorize payments across tag dimensions
#[derive(Parser)]
#[command(name = "financebook")]
#[command(version)]
struct Cli {
    /// Database file (overrides FINANCEBOOK_DB)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an owner with its standard dimension and UNCLASSIFIED tag
    Provision { username: String },

    /// Import a `;`-separated batch from a file, or `-` for stdin
    Import {
        #[command(flatten)]
        owner: OwnerArg,
        file: PathBuf,
    },

    #[command(subcommand)]
    Dimension(DimensionCommand),

    #[command(subcommand)]
    Tag(TagCommand),

    #[command(subcommand)]
    Recipient(RecipientCommand),

    #[command(subcommand)]
    Payment(PaymentCommand),
}

#[derive(Args)]
struct OwnerArg {
    /// Owner username
    #[arg(long, env = "FINANCEBOOK_OWNER")]
    owner: String,
}

#[derive(Subcommand)]
enum DimensionCommand {
    Add {
        #[command(flatten)]
        owner: OwnerArg,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    List {
        #[command(flatten)]
        owner: OwnerArg,
    },
}

#[derive(Subcommand)]
enum TagCommand {
    /// Add a tag; defaults to the owner's standard dimension
    Add {
        #[command(flatten)]
        owner: OwnerArg,
        name: String,
        #[arg(long)]
        dimension: Option<String>,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    List {
        #[command(flatten)]
        owner: OwnerArg,
        #[arg(long)]
        dimension: Option<String>,
    },
    /// Every tag below the given one, breadth first
    Descendants {
        #[command(flatten)]
        owner: OwnerArg,
        tag_id: String,
    },
    /// The tag with its children nested below it
    Tree {
        #[command(flatten)]
        owner: OwnerArg,
        tag_id: String,
    },
}

#[derive(Subcommand)]
enum RecipientCommand {
    Add {
        #[command(flatten)]
        owner: OwnerArg,
        name: String,
        #[arg(long)]
        address: Option<String>,
    },
    List {
        #[command(flatten)]
        owner: OwnerArg,
    },
}

#[derive(Subcommand)]
enum PaymentCommand {
    Add {
        #[command(flatten)]
        owner: OwnerArg,
        #[arg(allow_negative_numbers = true)]
        amount: Decimal,
        /// YYYY-MM-DD
        date: NaiveDate,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        recipient: Option<String>,
        /// Repeat for several dimensions
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        periodic: bool,
    },
    List {
        #[command(flatten)]
        owner: OwnerArg,
        /// Matches the tag and all of its descendants; repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long, conflicts_with = "income_only")]
        expense_only: bool,
        #[arg(long)]
        income_only: bool,
    },
    Delete {
        #[command(flatten)]
        owner: OwnerArg,
        id: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(path) = cli.db {
        config = config.with_database_path(path);
    }

    let mut book = Book::open(&config)
        .with_context(|| format!("Failed to open database: {}", config.database_path.display()))?;

    run(&mut book, cli.command)
}

fn run(book: &mut Book, command: Commands) -> Result<()> {
    match command {
        Commands::Provision { username } => print_json(&book.provision_owner(&username)?),

        Commands::Import { owner, file } => {
            let owner_id = owner_id(book, &owner)?;
            let text = read_input(&file)?;
            print_json(&book.import_batch(&owner_id, &text)?)
        }

        Commands::Dimension(DimensionCommand::Add {
            owner,
            name,
            description,
        }) => {
            let owner_id = owner_id(book, &owner)?;
            print_json(&book.create_dimension(&owner_id, &name, description.as_deref())?)
        }
        Commands::Dimension(DimensionCommand::List { owner }) => {
            let owner_id = owner_id(book, &owner)?;
            print_json(&book.list_dimensions(&owner_id)?)
        }

        Commands::Tag(TagCommand::Add {
            owner,
            name,
            dimension,
            parent,
            icon,
        }) => {
            let owner_id = owner_id(book, &owner)?;
            let dimension_id = match dimension {
                Some(id) => id,
                None => book
                    .owner_defaults(&owner_id)?
                    .standard_dimension_id
                    .context("owner has no standard dimension; pass --dimension")?,
            };
            let new = NewTagNode {
                name,
                dimension_id,
                parent_id: parent,
                icon_ref: icon,
            };
            print_json(&book.create_tag_node(&owner_id, &new)?)
        }
        Commands::Tag(TagCommand::List { owner, dimension }) => {
            let owner_id = owner_id(book, &owner)?;
            match dimension {
                Some(dimension_id) => print_json(&book.list_tag_nodes_by_dimension(&owner_id, &dimension_id)?),
                None => print_json(&book.list_tag_nodes(&owner_id)?),
            }
        }
        Commands::Tag(TagCommand::Descendants { owner, tag_id }) => {
            let owner_id = owner_id(book, &owner)?;
            print_json(&book.list_descendants(&owner_id, &tag_id)?)
        }
        Commands::Tag(TagCommand::Tree { owner, tag_id }) => {
            let owner_id = owner_id(book, &owner)?;
            print_json(&book.tag_tree(&owner_id, &tag_id)?)
        }

        Commands::Recipient(RecipientCommand::Add {
            owner,
            name,
            address,
        }) => {
            let owner_id = owner_id(book, &owner)?;
            print_json(&book.create_recipient(&owner_id, &name, address.as_deref())?)
        }
        Commands::Recipient(RecipientCommand::List { owner }) => {
            let owner_id = owner_id(book, &owner)?;
            print_json(&book.list_recipients(&owner_id)?)
        }

        Commands::Payment(PaymentCommand::Add {
            owner,
            amount,
            date,
            description,
            recipient,
            tags,
            periodic,
        }) => {
            let owner_id = owner_id(book, &owner)?;
            let new = NewPaymentItem {
                amount,
                date,
                periodic,
                description,
                recipient_id: recipient,
                tag_ids: Some(tags),
            };
            print_json(&book.create_payment_item(&owner_id, &new)?)
        }
        Commands::Payment(PaymentCommand::List {
            owner,
            tags,
            expense_only,
            income_only,
        }) => {
            let owner_id = owner_id(book, &owner)?;
            let filter = PaymentFilter {
                tag_ids: tags,
                expense_only,
                income_only,
            };
            print_json(&book.list_payment_items(&owner_id, &filter)?)
        }
        Commands::Payment(PaymentCommand::Delete { owner, id }) => {
            let owner_id = owner_id(book, &owner)?;
            book.delete_payment_item(&owner_id, &id)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}

fn owner_id(book: &Book, owner: &OwnerArg) -> Result<String> {
    Ok(book.find_owner(&owner.owner)?.id)
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
