mod import;
mod open;
mod writes;
