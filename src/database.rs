/// Salsa database holding record graph inputs and their compiled outputs.
#[derive(Default, Clone)]
#[salsa::db]
pub struct OdsDatabase {
    storage: salsa::Storage<Self>,
}

#[salsa::db]
impl salsa::Database for OdsDatabase {}
