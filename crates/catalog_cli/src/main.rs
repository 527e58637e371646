//! Catalog command-line entry point.
//!
//! # Responsibility
//! - Wire config, logging, pool, repository and service from `CATALOG_*`
//!   environment settings.
//! - Expose catalog reads and inserts as JSON-printing subcommands.

use catalog_core::{
    core_version, init_logging, open_pool, parse_add_item_request, CatalogConfig, CatalogService,
    ImageStore, Item, MultipartForm, RepoError, SqliteItemRepository,
};
use log::error;
use serde_json::json;
use std::process::ExitCode;

const USAGE: &str = "usage: catalog_cli <list | search <keyword> | get <id> | add <name> <category> <image-path> | export | version>";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<String, String> {
    let command = args.first().map(String::as_str).ok_or(USAGE)?;
    if command == "version" {
        return Ok(format!("catalog_core version={}", core_version()));
    }

    let config = CatalogConfig::from_env();
    init_logging(&config.log_level, config.log_dir.as_deref())?;
    let service = open_service(&config)?;

    match (command, &args[1..]) {
        ("list", []) => {
            let items = service.list_items().map_err(report)?;
            to_json(&json!({ "items": with_ids(&items) }))
        }
        ("search", [keyword]) => {
            let items = service.search_items(keyword).map_err(report)?;
            to_json(&json!({ "items": with_ids(&items) }))
        }
        ("get", [id]) => {
            let id = id.parse().map_err(|_| format!("invalid item id `{id}`"))?;
            to_json(&with_id(&service.get_item(id).map_err(report)?))
        }
        ("add", [name, category, image_path]) => {
            let image = std::fs::read(image_path)
                .map_err(|err| format!("failed to read image `{image_path}`: {err}"))?;
            let form = MultipartForm::default()
                .with_text("name", name.as_str())
                .with_text("category", category.as_str())
                .with_file("image", image);
            let request = parse_add_item_request(&form).map_err(|err| err.to_string())?;
            to_json(&with_id(&service.add_item(request).map_err(report)?))
        }
        ("export", []) => {
            let snapshot = service.export_snapshot().map_err(report)?;
            let file_name = service.catalog_file_name();
            std::fs::write(file_name, to_json(&snapshot)?)
                .map_err(|err| format!("failed to write `{file_name}`: {err}"))?;
            Ok(format!(
                "exported {} items to {file_name}",
                snapshot.items.len()
            ))
        }
        _ => Err(USAGE.to_string()),
    }
}

fn open_service(config: &CatalogConfig) -> Result<CatalogService<SqliteItemRepository>, String> {
    if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create `{}`: {err}", parent.display()))?;
    }
    let pool = open_pool(&config.db_path).map_err(|err| err.to_string())?;
    let repo = SqliteItemRepository::try_new(
        pool,
        ImageStore::new(&config.image_dir),
        config.catalog_file_name.as_str(),
    )
    .map_err(report)?;
    Ok(CatalogService::new(repo))
}

fn report(err: RepoError) -> String {
    if err.is_not_found() {
        return err.to_string();
    }
    if err.is_client_error() {
        return format!("invalid request: {err}");
    }
    error!("event=cli_command module=cli status=error error={err}");
    format!("catalog error: {err}")
}

fn with_id(item: &Item) -> serde_json::Value {
    json!({
        "id": item.id,
        "name": item.name,
        "category": item.category,
        "image_name": item.image_name,
    })
}

fn with_ids(items: &[Item]) -> Vec<serde_json::Value> {
    items.iter().map(with_id).collect()
}

fn to_json(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|err| err.to_string())
}
