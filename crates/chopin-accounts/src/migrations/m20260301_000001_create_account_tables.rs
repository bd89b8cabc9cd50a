use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ── accounts ──
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Provider).string().not_null())
                    .col(ColumnDef::new(Accounts::ProviderUserId).string().not_null())
                    .col(ColumnDef::new(Accounts::DisplayName).string().not_null())
                    .col(ColumnDef::new(Accounts::Email).string().null())
                    .col(
                        ColumnDef::new(Accounts::EmailKey)
                            .string()
                            .null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Accounts::EmailVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Accounts::AvatarUrl).string().null())
                    .col(ColumnDef::new(Accounts::AuthMethod).string().not_null())
                    .col(ColumnDef::new(Accounts::Password).string().null())
                    .col(ColumnDef::new(Accounts::LastAccess).timestamp().null())
                    .col(ColumnDef::new(Accounts::Profile).text().not_null())
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Accounts::UpdatedAt).timestamp().not_null())
                    .primary_key(
                        Index::create()
                            .col(Accounts::Provider)
                            .col(Accounts::ProviderUserId),
                    )
                    .to_owned(),
            )
            .await?;

        // ── activation_tokens ──
        manager
            .create_table(
                Table::create()
                    .table(ActivationTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActivationTokens::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ActivationTokens::TokenHash)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ActivationTokens::Provider).string().not_null())
                    .col(
                        ColumnDef::new(ActivationTokens::ProviderUserId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ActivationTokens::State).string().not_null())
                    .col(
                        ColumnDef::new(ActivationTokens::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_activation_tokens_state_created")
                    .table(ActivationTokens::Table)
                    .col(ActivationTokens::State)
                    .col(ActivationTokens::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ── password_reset_tokens ──
        manager
            .create_table(
                Table::create()
                    .table(PasswordResetTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PasswordResetTokens::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PasswordResetTokens::TokenHash)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(PasswordResetTokens::Username)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PasswordResetTokens::Provider)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PasswordResetTokens::ProviderUserId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PasswordResetTokens::State).string().not_null())
                    .col(
                        ColumnDef::new(PasswordResetTokens::ExpiresAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PasswordResetTokens::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PasswordResetTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ActivationTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Accounts {
    Table,
    Provider,
    ProviderUserId,
    DisplayName,
    Email,
    EmailKey,
    EmailVerified,
    AvatarUrl,
    AuthMethod,
    Password,
    LastAccess,
    Profile,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ActivationTokens {
    Table,
    Id,
    TokenHash,
    Provider,
    ProviderUserId,
    State,
    CreatedAt,
}

#[derive(Iden)]
enum PasswordResetTokens {
    Table,
    Id,
    TokenHash,
    Username,
    Provider,
    ProviderUserId,
    State,
    ExpiresAt,
    CreatedAt,
}
