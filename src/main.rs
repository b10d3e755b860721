// src/main.rs

//! # FAIR PLC DID Engine - Command Line Entry Point
//!
//! Manages `did:plc` identifiers for a FAIR package host: key generation,
//! genesis registration with the public PLC directory, diff-based updates,
//! and operation-log inspection.
//!
//! ## Environment Variables
//! - `PLC_DIRECTORY_URL`: (Optional) PLC directory base URL
//!   (default: https://plc.directory)
//! - `FAIR_REPO_URL`: Base URL of this host's package repository, used to
//!   derive the advertised service endpoint
//! - `DID_STORE_PATH`: (Optional) Directory for DID records
//!   (default: ./did-store)

use anyhow::{bail, Context};
use dotenv::dotenv;

use fair_plc::keys::KeyCache;
use fair_plc::plc::did::{Did, PlcContext, UpdateOutcome};
use fair_plc::services::directory::DirectoryClient;
use fair_plc::storage::record_store::{FileStore, RecordStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::init();

    let directory_url = std::env::var("PLC_DIRECTORY_URL")
        .unwrap_or_else(|_| DirectoryClient::DEFAULT_URL.to_string());
    let repo_url = std::env::var("FAIR_REPO_URL")
        .unwrap_or_else(|_| "http://localhost/wp-json/fair".to_string());
    let store_path = std::env::var("DID_STORE_PATH").unwrap_or_else(|_| "./did-store".to_string());

    let ctx = PlcContext::new(DirectoryClient::new(directory_url), repo_url);
    let store = FileStore::new(store_path);

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "help".to_string());

    match command.as_str() {
        // Create and register a brand-new DID.
        "generate" => {
            let did = Did::create(&ctx, &store).await?;
            print_did(&did)?;
        }

        // Show a stored DID and its public keys.
        "get" => {
            let id = args.next().context("usage: fair-plc get <did>")?;
            match Did::get(&store, &id)? {
                Some(did) => {
                    print_did(&did)?;
                    let published = did.is_published(&ctx).await;
                    println!("Published:        {}", if published { "yes" } else { "no" });
                }
                None => bail!("DID not found: {id}"),
            }
        }

        // Push local state to the directory if it changed.
        "update" => {
            let id = args.next().context("usage: fair-plc update <did>")?;
            let did = Did::get(&store, &id)?.with_context(|| format!("DID not found: {id}"))?;
            let mut cache = KeyCache::new();
            match did.update(&ctx, &mut cache).await? {
                UpdateOutcome::NoChanges => println!("No changes to update"),
                UpdateOutcome::Submitted => println!("Update submitted"),
            }
        }

        // Add a verification key, propagate it, persist.
        "add-key" => {
            let id = args.next().context("usage: fair-plc add-key <did>")?;
            let mut did = Did::get(&store, &id)?.with_context(|| format!("DID not found: {id}"))?;
            let encoded = did.generate_verification_key()?;
            let mut cache = KeyCache::new();
            did.update(&ctx, &mut cache).await?;
            did.save(&store)?;
            println!("Verification key: {encoded}");
        }

        // Revoke a verification key, propagate the removal, persist.
        "revoke-key" => {
            let id = args.next().context("usage: fair-plc revoke-key <did> <public-key>")?;
            let key = args
                .next()
                .context("usage: fair-plc revoke-key <did> <public-key>")?;
            let mut did = Did::get(&store, &id)?.with_context(|| format!("DID not found: {id}"))?;
            let mut cache = KeyCache::new();
            did.invalidate_verification_key(&key, &mut cache)?;
            did.update(&ctx, &mut cache).await?;
            did.save(&store)?;
            println!("Revoked {key}");
        }

        // Print the directory's full operation history for a DID.
        "audit" => {
            let id = args.next().context("usage: fair-plc audit <did>")?;
            let did = Did::get(&store, &id)?.with_context(|| format!("DID not found: {id}"))?;
            match did.fetch_audit_log(&ctx).await {
                Some(entries) => println!("{}", serde_json::to_string_pretty(&entries)?),
                None => println!("Audit log unavailable"),
            }
        }

        // List all locally stored DIDs.
        "list" => {
            for id in store.list()? {
                println!("{id}");
            }
        }

        _ => {
            eprintln!("fair-plc - manage did:plc identifiers for a FAIR package host");
            eprintln!();
            eprintln!("Commands:");
            eprintln!("  generate                      Create and register a new DID");
            eprintln!("  get <did>                     Show a stored DID and its public keys");
            eprintln!("  update <did>                  Push local key state to the directory");
            eprintln!("  add-key <did>                 Add a verification key");
            eprintln!("  revoke-key <did> <public-key> Revoke a verification key");
            eprintln!("  audit <did>                   Print the DID's operation history");
            eprintln!("  list                          List locally stored DIDs");
            if command != "help" {
                bail!("unknown command: {command}");
            }
        }
    }

    Ok(())
}

/// Prints a DID and its public key material, one line per key.
fn print_did(did: &Did) -> anyhow::Result<()> {
    let mut cache = KeyCache::new();
    println!("DID:              {}", did.id());
    for key in did.rotation_keys(&mut cache)? {
        println!("Rotation key:     {}", key.encode_public());
    }
    for key in did.verification_keys(&mut cache)? {
        println!("Verification key: {}", key.encode_public());
    }
    Ok(())
}
