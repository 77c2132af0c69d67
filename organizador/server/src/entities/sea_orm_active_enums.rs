use sea_orm::entity::prelude::*;

/// Stored as an integer code so existing rows keep their meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum Status {
    #[sea_orm(num_value = 0)]
    Pendente,
    #[sea_orm(num_value = 1)]
    Finalizado,
}
