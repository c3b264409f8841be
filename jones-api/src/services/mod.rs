pub mod account_service;
pub mod entitlement;
pub mod matching;
pub mod notification;
pub mod password;
pub mod quota;
pub mod subscription_service;
pub mod token_service;
