pub mod cast_handlers;
