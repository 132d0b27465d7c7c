#[macro_use]
extern crate clap;
extern crate vault_core;
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use tracing_subscriber::EnvFilter;
use vault_core::config::VaultConfig;
use vault_core::metadata_db::{PermissionMode, User};
use vault_core::vault::{DefaultVault, Result, VaultError, MAX_RATING, MIN_RATING};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let actor_arg = Arg::with_name("as")
        .long("as")
        .help("Name of the user performing the command")
        .required(true)
        .takes_value(true);
    let item_arg = Arg::with_name("ITEM_ID")
        .required(true)
        .index(1)
        .help("Id of the item")
        .validator(is_number);

    let init_cmd = SubCommand::with_name("init").about("creates (or upgrades) the vault database");

    let user_add_cmd = SubCommand::with_name("user-add")
        .about("registers a new user")
        .arg(Arg::with_name("NAME").required(true).index(1))
        .arg(
            Arg::with_name("admin")
                .long("admin")
                .help("Registers the user as administrator"),
        );
    let users_cmd = SubCommand::with_name("users").about("lists all registered users");
    let set_admin_cmd = SubCommand::with_name("set-admin")
        .about("grants or withdraws administrator rights")
        .arg(Arg::with_name("NAME").required(true).index(1))
        .arg(Arg::with_name("on").long("on").conflicts_with("off"))
        .arg(Arg::with_name("off").long("off"))
        .arg(actor_arg.clone());
    let user_remove_cmd = SubCommand::with_name("user-remove")
        .about("removes a user together with its permissions, ratings and suggestions")
        .arg(Arg::with_name("NAME").required(true).index(1))
        .arg(actor_arg.clone());

    let add_cmd = SubCommand::with_name("add")
        .about("shares a file or directory (recursively) as a new root item")
        .arg(
            Arg::with_name("PATH")
                .required(true)
                .index(1)
                .help("File system location to share"),
        )
        .arg(actor_arg.clone())
        .arg(
            Arg::with_name("permission")
                .long("permission")
                .short("p")
                .help("Who gets access to the new items: all, admin or self")
                .takes_value(true),
        );
    let remove_cmd = SubCommand::with_name("remove")
        .about("removes an item and everything below it")
        .arg(item_arg.clone())
        .arg(actor_arg.clone());

    let target_users_arg = Arg::with_name("user")
        .long("user")
        .short("u")
        .help("Users whose access changes")
        .required(true)
        .takes_value(true)
        .multiple(true)
        .number_of_values(1);
    let grant_cmd = SubCommand::with_name("grant")
        .about("grants users access to an item and everything below it")
        .arg(item_arg.clone())
        .arg(actor_arg.clone())
        .arg(target_users_arg.clone())
        .arg(
            Arg::with_name("overwrite")
                .long("overwrite")
                .help("Rewrites existing access records as well"),
        );
    let revoke_cmd = SubCommand::with_name("revoke")
        .about("denies users access to an item and everything below it")
        .arg(item_arg.clone())
        .arg(actor_arg.clone())
        .arg(target_users_arg);

    let ls_cmd = SubCommand::with_name("ls")
        .about("lists the root items or the children of a directory item")
        .arg(
            Arg::with_name("ITEM_ID")
                .index(1)
                .help("Id of the directory item")
                .validator(is_number),
        )
        .arg(actor_arg.clone());
    let rate_cmd = SubCommand::with_name("rate")
        .about("rates an item from 0 to 10")
        .arg(item_arg.clone())
        .arg(
            Arg::with_name("RATING")
                .required(true)
                .index(2)
                .help("Rating from 0 to 10")
                .validator(is_number),
        )
        .arg(actor_arg.clone());
    let suggest_cmd = SubCommand::with_name("suggest")
        .about("suggests an item to another user")
        .arg(item_arg)
        .arg(
            Arg::with_name("to")
                .long("to")
                .required(true)
                .takes_value(true)
                .help("Name of the receiving user"),
        )
        .arg(actor_arg.clone());
    let suggestions_cmd = SubCommand::with_name("suggestions")
        .about("lists the suggestions received by a user")
        .arg(actor_arg);

    let cli = App::new("MediaVault")
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Shares media directories with multiple users under inherited access control")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("db")
                .long("db")
                .help("Path of the vault database (overrides the config file)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .short("c")
                .help("TOML config file")
                .takes_value(true),
        )
        .subcommand(init_cmd)
        .subcommand(user_add_cmd)
        .subcommand(users_cmd)
        .subcommand(set_admin_cmd)
        .subcommand(user_remove_cmd)
        .subcommand(add_cmd)
        .subcommand(remove_cmd)
        .subcommand(grant_cmd)
        .subcommand(revoke_cmd)
        .subcommand(ls_cmd)
        .subcommand(rate_cmd)
        .subcommand(suggest_cmd)
        .subcommand(suggestions_cmd)
        .get_matches();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };
    let vault = match DefaultVault::open(config) {
        Ok(vault) => vault,
        Err(error) => {
            eprintln!("Could not open vault: {}", error);
            std::process::exit(1);
        }
    };

    let result = match cli.subcommand() {
        ("init", Some(_)) => init(&vault),
        ("user-add", Some(cmd_cli)) => add_user(&vault, cmd_cli),
        ("users", Some(_)) => list_users(&vault),
        ("set-admin", Some(cmd_cli)) => set_admin(&vault, cmd_cli),
        ("user-remove", Some(cmd_cli)) => remove_user(&vault, cmd_cli),
        ("add", Some(cmd_cli)) => add_items(&vault, cmd_cli),
        ("remove", Some(cmd_cli)) => remove_items(&vault, cmd_cli),
        ("grant", Some(cmd_cli)) => change_permissions(&vault, cmd_cli, true),
        ("revoke", Some(cmd_cli)) => change_permissions(&vault, cmd_cli, false),
        ("ls", Some(cmd_cli)) => list_items(&vault, cmd_cli),
        ("rate", Some(cmd_cli)) => rate_item(&vault, cmd_cli),
        ("suggest", Some(cmd_cli)) => suggest_item(&vault, cmd_cli),
        ("suggestions", Some(cmd_cli)) => list_suggestions(&vault, cmd_cli),
        _ => {
            println!("Please specify the command you want to perform on the vault.");
            println!("See --help for more information.");
            Ok(())
        }
    };

    if let Err(error) = result {
        eprintln!("Error: {}", error);
        std::process::exit(1);
    }
}

fn load_config(cli: &ArgMatches) -> std::result::Result<VaultConfig, String> {
    let mut config = match cli.value_of("config") {
        Some(path) => VaultConfig::from_file(path)
            .map_err(|error| format!("Could not load config '{}': {}", path, error))?,
        None => VaultConfig::default(),
    };
    if let Some(db_path) = cli.value_of("db") {
        config.database_path = db_path.to_string();
    }

    Ok(config)
}

fn is_number(value: String) -> std::result::Result<(), String> {
    value
        .parse::<i64>()
        .map(|_| ())
        .map_err(|_| format!("'{}' is not a whole number", value))
}

fn actor(vault: &DefaultVault, cmd_cli: &ArgMatches) -> Result<User> {
    user_named(vault, cmd_cli.value_of("as").unwrap_or_default())
}

fn user_named(vault: &DefaultVault, name: &str) -> Result<User> {
    vault.get_user_by_name(name).map_err(|error| match error {
        VaultError::NotFound => {
            eprintln!("Unknown user '{}'", name);
            VaultError::NotFound
        }
        error => error,
    })
}

fn item_id(cmd_cli: &ArgMatches) -> Result<i64> {
    cmd_cli
        .value_of("ITEM_ID")
        .unwrap_or_default()
        .parse()
        .map_err(|_| VaultError::NotFound)
}

fn init(vault: &DefaultVault) -> Result<()> {
    println!(
        "Vault database ready at '{}'",
        vault.config().database_path
    );
    Ok(())
}

fn add_user(vault: &DefaultVault, cmd_cli: &ArgMatches) -> Result<()> {
    let name = cmd_cli.value_of("NAME").unwrap_or_default();
    let user = vault.register_user(name, cmd_cli.is_present("admin"))?;

    println!(
        "Registered user '{}' (id: {}, administrator: {})",
        user.username, user.id, user.is_administrator
    );
    Ok(())
}

fn list_users(vault: &DefaultVault) -> Result<()> {
    for user in vault.list_users()? {
        let role = if user.is_administrator { "admin" } else { "user" };
        println!("{}\t{}\t{}", user.id, user.username, role);
    }
    Ok(())
}

fn set_admin(vault: &DefaultVault, cmd_cli: &ArgMatches) -> Result<()> {
    let actor = actor(vault, cmd_cli)?;
    let user = user_named(vault, cmd_cli.value_of("NAME").unwrap_or_default())?;
    let is_administrator = !cmd_cli.is_present("off");

    let user = vault.set_administrator(&actor, user.id, is_administrator)?;
    println!(
        "User '{}' administrator: {}",
        user.username, user.is_administrator
    );
    Ok(())
}

fn remove_user(vault: &DefaultVault, cmd_cli: &ArgMatches) -> Result<()> {
    let actor = actor(vault, cmd_cli)?;
    let user = user_named(vault, cmd_cli.value_of("NAME").unwrap_or_default())?;

    vault.delete_user(&actor, user.id)?;
    println!("Removed user '{}'", user.username);
    Ok(())
}

fn add_items(vault: &DefaultVault, cmd_cli: &ArgMatches) -> Result<()> {
    let owner = actor(vault, cmd_cli)?;
    let path = cmd_cli.value_of("PATH").unwrap_or_default();
    let mode = cmd_cli
        .value_of("permission")
        .map(PermissionMode::parse)
        .unwrap_or_else(|| vault.default_permission_mode());

    let count = vault.add_item_recursive(path, &owner, mode)?;
    println!("Added {} items from '{}' (permission: {})", count, path, mode.as_str());
    Ok(())
}

fn remove_items(vault: &DefaultVault, cmd_cli: &ArgMatches) -> Result<()> {
    let actor = actor(vault, cmd_cli)?;
    let count = vault.remove_item_recursive(&actor, item_id(cmd_cli)?)?;

    println!("Removed {} items", count);
    Ok(())
}

fn change_permissions(vault: &DefaultVault, cmd_cli: &ArgMatches, grant: bool) -> Result<()> {
    let actor = actor(vault, cmd_cli)?;
    let item_id = item_id(cmd_cli)?;
    let users = cmd_cli
        .values_of("user")
        .map(|names| {
            names
                .map(|name| user_named(vault, name))
                .collect::<Result<Vec<_>>>()
        })
        .unwrap_or_else(|| Ok(Vec::new()))?;

    let count = if grant {
        vault.grant_permission_recursive(&actor, item_id, &users, cmd_cli.is_present("overwrite"))?
    } else {
        vault.remove_permission_recursive(&actor, item_id, &users)?
    };
    println!("Wrote {} access records", count);
    Ok(())
}

fn list_items(vault: &DefaultVault, cmd_cli: &ArgMatches) -> Result<()> {
    let user = actor(vault, cmd_cli)?;
    let items = if cmd_cli.is_present("ITEM_ID") {
        vault.explore(item_id(cmd_cli)?, &user)?
    } else {
        vault.get_root_items(&user)?
    };

    for item in items {
        println!("{}\t{}\t{}", item.id, item.media_type(), item.name);
    }
    Ok(())
}

fn rate_item(vault: &DefaultVault, cmd_cli: &ArgMatches) -> Result<()> {
    let user = actor(vault, cmd_cli)?;
    let item_id = item_id(cmd_cli)?;
    // Clamp before narrowing, huge values must end up as the maximum rating.
    let rating = clap::value_t_or_exit!(cmd_cli, "RATING", i64)
        .max(i64::from(MIN_RATING))
        .min(i64::from(MAX_RATING)) as i32;

    let rating = vault.rate_item(item_id, &user, rating)?;
    match vault.rating_summary(item_id, &user)? {
        Some(summary) => println!(
            "Rated item {} with {} (average {:.1} of {} ratings)",
            item_id, rating, summary.average, summary.count
        ),
        None => println!("Rated item {} with {}", item_id, rating),
    }
    Ok(())
}

fn suggest_item(vault: &DefaultVault, cmd_cli: &ArgMatches) -> Result<()> {
    let user = actor(vault, cmd_cli)?;
    let receiver = user_named(vault, cmd_cli.value_of("to").unwrap_or_default())?;
    let item_id = item_id(cmd_cli)?;

    vault.suggest_item(&user, receiver.id, item_id)?;
    println!("Suggested item {} to '{}'", item_id, receiver.username);
    Ok(())
}

fn list_suggestions(vault: &DefaultVault, cmd_cli: &ArgMatches) -> Result<()> {
    let user = actor(vault, cmd_cli)?;

    for suggestion in vault.suggestions_for(&user, None)? {
        let item = vault.get_item(suggestion.item_id)?;
        let sender = vault.get_user(suggestion.from_user_id)?;
        println!("{}\t{}\tfrom {}", item.id, item.name, sender.username);
    }
    Ok(())
}
