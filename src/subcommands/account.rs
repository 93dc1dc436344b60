use std::io::{BufRead, IsTerminal};

use color_eyre::{
    Result,
    eyre::{WrapErr, eyre},
};
use drugprice::{
    auth::{SessionStore, authenticate},
    config::Config,
    gateway::RestClient,
};

pub enum Password {
    Given(String),
    Stdin,
}

pub struct LoginOptions {
    pub username: String,
    pub password: Password,
}

pub fn session_store() -> Result<SessionStore> {
    SessionStore::default_location().ok_or_else(|| eyre!("could not determine a data directory"))
}

pub async fn login(config: &Config, options: LoginOptions) -> Result<()> {
    let password = match options.password {
        Password::Given(password) => password,
        Password::Stdin => read_password()?,
    };
    let client = RestClient::from_config(config)?;
    let session = authenticate(&client, &config.users_table, &options.username, &password).await?;
    let store = session_store()?;
    store
        .save(&session)
        .wrap_err_with(|| format!("failed to save session to {}", store.path().display()))?;
    println!("Xin chào, {}", session.display_name);
    Ok(())
}

pub fn logout() -> Result<()> {
    let store = session_store()?;
    if store.clear().wrap_err("failed to remove session")? {
        println!("Đã đăng xuất");
    } else {
        println!("Chưa đăng nhập");
    }
    Ok(())
}

pub fn whoami() -> Result<()> {
    match session_store()?.load() {
        Some(session) => println!("{} ({})", session.display_name, session.username),
        None => println!("Chưa đăng nhập"),
    }
    Ok(())
}

fn read_password() -> Result<String> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprint!("Mật khẩu: ");
    }
    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .wrap_err("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
