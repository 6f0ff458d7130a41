use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;

use rentledger::{
    Role, assign_role,
    content_store::{ContentStore, FieldValue, Fields, PROPERTY_CONTENT_TYPE, SqliteContentStore},
};

/// A utility for creating a test database for the REST API server of rentledger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The identity provider's ID of the user to make an admin.
    #[arg(long, default_value = "test_admin")]
    admin_id: String,
}

/// Create and populate a database for manual testing.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;
    let store = SqliteContentStore::new(conn, "localhost:3000")?;

    println!("Creating admin {}...", args.admin_id);
    assign_role(&store, &args.admin_id, Role::Admin).await?;

    println!("Creating listings...");
    for (title, address, bedrooms, published) in [
        ("Unit A", "12 Harbour Road", 2, true),
        ("Unit B", "12 Harbour Road", 3, true),
        ("Cottage", "4 Hill Street", 1, false),
    ] {
        let fields = Fields::from([
            ("title".to_owned(), FieldValue::from(title)),
            ("address".to_owned(), FieldValue::from(address)),
            ("bedroomsNum".to_owned(), FieldValue::Integer(bedrooms)),
            ("publishProperty".to_owned(), FieldValue::Bool(published)),
        ]);
        let entry = store.create_entry(PROPERTY_CONTENT_TYPE, fields).await?;

        if published {
            store.publish_entry(&entry.id).await?;
        }
    }

    println!("Success!");

    Ok(())
}
