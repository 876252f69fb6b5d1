mod orders;
mod products;

use crate::cli::{Command, OrdersAction, ProductsAction};
use crate::error::CliError;

pub async fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Orders {
            action: OrdersAction::Serve(args),
        } => orders::serve(args).await,
        Command::Products {
            action: ProductsAction::Serve(args),
        } => products::serve(args).await,
    }
}
