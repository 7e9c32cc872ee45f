//! Interactions, contracts and decoded requests.

mod contract;
mod interaction;
mod request;

pub use contract::{Contract, SpecVersion};
pub use interaction::{
    Interaction, InteractionKind, MessageShape, ProviderState, RequestShape, ResponseShape,
    WireResponse,
};
pub use request::{encode_query, parse_query, ActualBody, ActualRequest};
