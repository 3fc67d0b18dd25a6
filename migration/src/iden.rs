use sea_orm_migration::prelude::*;

// Define table names
#[derive(DeriveIden)]
pub enum Organisations {
    Table,
    Id,
    Name,
    ContactInfo,
}

#[derive(DeriveIden)]
pub enum Volunteers {
    Table,
    Id,
    Name,
    Email,
    OrganisationId,
    AuthId,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Seniors {
    Table,
    Id,
    Name,
    Age,
    SpokenLanguage,
    #[sea_orm(iden = "last_four_char_NRIC")]
    LastFourCharNric,
    PostalCode,
}

#[derive(DeriveIden)]
pub enum Activities {
    Table,
    Id,
    VolunteerId,
    SeniorId,
    Category,
    Issue,
    Resolved,
    ActivityDate,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum CareSummary {
    Table,
    SeniorId,
    Response,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum AppUser {
    Table,
    Id,
    VolunteerId,
    AuthId,
    AccessToken,
    RefreshToken,
    TokenExpiresAt,
}
