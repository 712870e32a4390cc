use super::ScError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoolError {
    #[error("{0} table is full")]
    Full(PoolItem),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoolItem {
    Literals,
    Instructions,
    Labels,
}

impl std::fmt::Display for PoolItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PoolItem::Literals => "literal",
            PoolItem::Instructions => "instruction",
            PoolItem::Labels => "label",
        })
    }
}

impl ScError for PoolError {}

pub type PoolResult<O = ()> = Result<O, PoolError>;
