use mutaties::model::{Migrations, Pool};
use mutaties::Error;

pub async fn migrate() -> Result<(), Error> {
    let pool = Pool::from_env();
    Migrations::migrate(&pool).await?;
    log::info!("Queue tables are up to date");

    Ok(())
}
