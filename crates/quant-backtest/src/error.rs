use quant_core::error::DataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Invalid backtest configuration: {0}")]
    InvalidConfig(String),

    #[error("No bars for {0}")]
    NoData(String),

    #[error("Bars for {0} are not in strictly increasing time order")]
    UnorderedBars(String),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Backtest task failed: {0}")]
    Task(String),
}
