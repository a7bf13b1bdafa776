pub mod quote_dto;
pub mod listing_dto;
