use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;

use rentledger::{Role, assign_role, content_store::SqliteContentStore};

/// A utility for setting the role of a user, e.g. to bootstrap the first admin.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The identity provider's ID for the user.
    #[arg(long)]
    user_id: String,

    /// One of admin, member or tenant.
    #[arg(long)]
    role: Role,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let db_path = Path::new(&args.db_path);

    if !db_path.is_file() {
        eprintln!("No database found at {db_path:#?}.");
        exit(1);
    }

    let conn = Connection::open(db_path)?;
    let store = SqliteContentStore::new(conn, "localhost:3000")?;

    let entry = assign_role(&store, &args.user_id, args.role).await?;
    println!(
        "User {} is now {}",
        entry.user_id,
        entry.role.map(|role| role.to_string()).unwrap_or_default()
    );

    Ok(())
}
