use mutaties::config::Config;
use mutaties::websim::{bondspas_server, mail_server};
use mutaties::Error;

pub async fn mail(port: Option<u16>) -> Result<(), Error> {
    mail_server(Config::get(), port).await?.launch().await?;
    Ok(())
}

pub async fn bondspas(port: Option<u16>) -> Result<(), Error> {
    bondspas_server(Config::get(), port).await?.launch().await?;
    Ok(())
}
