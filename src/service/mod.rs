//! CrudService: generic CRUD over the store, plus request validation.

mod crud;
mod validation;
pub use crud::CrudService;
pub use validation::RequestValidator;
