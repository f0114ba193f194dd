use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_offices_table::Migration),
            Box::new(m20240101_000002_create_pricing_tables::Migration),
            Box::new(m20240101_000003_create_promotions_table::Migration),
            Box::new(m20240101_000004_create_orders_table::Migration),
            Box::new(m20240101_000005_create_shipments_tables::Migration),
            Box::new(m20240101_000006_create_order_histories_table::Migration),
            Box::new(m20240101_000007_create_cod_tables::Migration),
            Box::new(m20240101_000008_create_transactions_table::Migration),
        ]
    }
}

mod m20240101_000001_create_offices_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_offices_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Offices::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Offices::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Offices::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Offices::Name).string().not_null())
                        .col(ColumnDef::new(Offices::City).string().not_null())
                        .col(ColumnDef::new(Offices::Ward).string().null())
                        .col(ColumnDef::new(Offices::Address).string().null())
                        .col(ColumnDef::new(Offices::Capacity).integer().null())
                        .col(
                            ColumnDef::new(Offices::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Offices::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_offices_city_ward")
                        .table(Offices::Table)
                        .col(Offices::City)
                        .col(Offices::Ward)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Offices::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Offices {
        Table,
        Id,
        Code,
        Name,
        City,
        Ward,
        Address,
        Capacity,
        IsActive,
        CreatedAt,
    }
}

mod m20240101_000002_create_pricing_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_pricing_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ServiceTypes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ServiceTypes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceTypes::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ServiceTypes::Name).string().not_null())
                        .col(
                            ColumnDef::new(ServiceTypes::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ShippingRates::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShippingRates::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ShippingRates::ServiceTypeId).uuid().not_null())
                        .col(ColumnDef::new(ShippingRates::OriginRegion).string().null())
                        .col(
                            ColumnDef::new(ShippingRates::DestinationRegion)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ShippingRates::WeightFrom)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ShippingRates::WeightTo).decimal().null())
                        .col(ColumnDef::new(ShippingRates::Price).decimal().not_null())
                        .col(ColumnDef::new(ShippingRates::ExtraPrice).decimal().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipping_rates_service_type")
                        .table(ShippingRates::Table)
                        .col(ShippingRates::ServiceTypeId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ShippingRates::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ServiceTypes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ServiceTypes {
        Table,
        Id,
        Code,
        Name,
        IsActive,
    }

    #[derive(DeriveIden)]
    enum ShippingRates {
        Table,
        Id,
        ServiceTypeId,
        OriginRegion,
        DestinationRegion,
        WeightFrom,
        WeightTo,
        Price,
        ExtraPrice,
    }
}

mod m20240101_000003_create_promotions_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_promotions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Promotions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Promotions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Promotions::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Promotions::Description).string().null())
                        .col(ColumnDef::new(Promotions::DiscountType).string().not_null())
                        .col(
                            ColumnDef::new(Promotions::DiscountValue)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Promotions::MaxDiscountAmount)
                                .decimal()
                                .null(),
                        )
                        .col(ColumnDef::new(Promotions::MinOrderValue).decimal().null())
                        .col(ColumnDef::new(Promotions::UsageLimit).integer().null())
                        .col(
                            ColumnDef::new(Promotions::UsageCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Promotions::StartsAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Promotions::EndsAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Promotions::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Promotions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Promotions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Promotions {
        Table,
        Id,
        Code,
        Description,
        DiscountType,
        DiscountValue,
        MaxDiscountAmount,
        MinOrderValue,
        UsageLimit,
        UsageCount,
        StartsAt,
        EndsAt,
        IsActive,
        CreatedAt,
    }
}

mod m20240101_000004_create_orders_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Orders::TrackingNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::SenderName).string().not_null())
                        .col(ColumnDef::new(Orders::SenderPhone).string().not_null())
                        .col(ColumnDef::new(Orders::SenderCity).string().not_null())
                        .col(ColumnDef::new(Orders::SenderWard).string().null())
                        .col(ColumnDef::new(Orders::SenderAddress).string().not_null())
                        .col(ColumnDef::new(Orders::RecipientName).string().not_null())
                        .col(ColumnDef::new(Orders::RecipientPhone).string().not_null())
                        .col(ColumnDef::new(Orders::RecipientCity).string().not_null())
                        .col(ColumnDef::new(Orders::RecipientWard).string().null())
                        .col(
                            ColumnDef::new(Orders::RecipientAddress)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::Weight).decimal().not_null())
                        .col(ColumnDef::new(Orders::ServiceTypeId).uuid().not_null())
                        .col(ColumnDef::new(Orders::ShippingFee).decimal().not_null())
                        .col(
                            ColumnDef::new(Orders::DiscountAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::PromotionId).uuid().null())
                        .col(
                            ColumnDef::new(Orders::CodAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::Payer).string().not_null())
                        .col(ColumnDef::new(Orders::PaymentMethod).string().not_null())
                        .col(ColumnDef::new(Orders::PaymentStatus).string().not_null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(ColumnDef::new(Orders::OriginOfficeId).uuid().null())
                        .col(
                            ColumnDef::new(Orders::DestinationOfficeId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(Orders::ActualRecipient).string().null())
                        .col(
                            ColumnDef::new(Orders::DeliveredAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Orders::Notes).string().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_origin_office")
                        .table(Orders::Table)
                        .col(Orders::OriginOfficeId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_destination_office")
                        .table(Orders::Table)
                        .col(Orders::DestinationOfficeId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        TrackingNumber,
        SenderName,
        SenderPhone,
        SenderCity,
        SenderWard,
        SenderAddress,
        RecipientName,
        RecipientPhone,
        RecipientCity,
        RecipientWard,
        RecipientAddress,
        Weight,
        ServiceTypeId,
        ShippingFee,
        DiscountAmount,
        PromotionId,
        CodAmount,
        Payer,
        PaymentMethod,
        PaymentStatus,
        Status,
        OriginOfficeId,
        DestinationOfficeId,
        CreatedBy,
        ActualRecipient,
        DeliveredAt,
        Notes,
        CreatedAt,
        UpdatedAt,
        Version,
    }
}

mod m20240101_000005_create_shipments_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_shipments_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Shipments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Shipments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Shipments::DriverId).uuid().not_null())
                        .col(ColumnDef::new(Shipments::VehicleId).uuid().null())
                        .col(ColumnDef::new(Shipments::OfficeId).uuid().not_null())
                        .col(ColumnDef::new(Shipments::Status).string().not_null())
                        .col(
                            ColumnDef::new(Shipments::StartTime)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::EndTime)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_driver")
                        .table(Shipments::Table)
                        .col(Shipments::DriverId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ShipmentOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShipmentOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ShipmentOrders::ShipmentId).uuid().not_null())
                        .col(ColumnDef::new(ShipmentOrders::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(ShipmentOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shipment_orders_shipment")
                                .from(ShipmentOrders::Table, ShipmentOrders::ShipmentId)
                                .to(Shipments::Table, Shipments::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipment_orders_pair")
                        .table(ShipmentOrders::Table)
                        .col(ShipmentOrders::ShipmentId)
                        .col(ShipmentOrders::OrderId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipment_orders_order")
                        .table(ShipmentOrders::Table)
                        .col(ShipmentOrders::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ShipmentOrders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Shipments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Shipments {
        Table,
        Id,
        DriverId,
        VehicleId,
        OfficeId,
        Status,
        StartTime,
        EndTime,
        CreatedAt,
        UpdatedAt,
        Version,
    }

    #[derive(DeriveIden)]
    enum ShipmentOrders {
        Table,
        Id,
        ShipmentId,
        OrderId,
        CreatedAt,
    }
}

mod m20240101_000006_create_order_histories_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_order_histories_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderHistories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderHistories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderHistories::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderHistories::FromOfficeId).uuid().null())
                        .col(ColumnDef::new(OrderHistories::ToOfficeId).uuid().null())
                        .col(ColumnDef::new(OrderHistories::ShipmentId).uuid().null())
                        .col(ColumnDef::new(OrderHistories::Action).string().not_null())
                        .col(ColumnDef::new(OrderHistories::FromStatus).string().null())
                        .col(ColumnDef::new(OrderHistories::ToStatus).string().not_null())
                        .col(ColumnDef::new(OrderHistories::ActorId).uuid().null())
                        .col(ColumnDef::new(OrderHistories::Note).string().null())
                        .col(
                            ColumnDef::new(OrderHistories::ActionTime)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_histories_order")
                        .table(OrderHistories::Table)
                        .col(OrderHistories::OrderId)
                        .col(OrderHistories::ActionTime)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderHistories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderHistories {
        Table,
        Id,
        OrderId,
        FromOfficeId,
        ToOfficeId,
        ShipmentId,
        Action,
        FromStatus,
        ToStatus,
        ActorId,
        Note,
        ActionTime,
    }
}

mod m20240101_000007_create_cod_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000007_create_cod_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ShippingCollections::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShippingCollections::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShippingCollections::OrderId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ShippingCollections::AgentId).uuid().not_null())
                        .col(
                            ColumnDef::new(ShippingCollections::OfficeId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShippingCollections::AmountCollected)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShippingCollections::ExpectedAmount)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShippingCollections::Discrepancy)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShippingCollections::PaymentSubmissionId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ShippingCollections::CollectedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipping_collections_office")
                        .table(ShippingCollections::Table)
                        .col(ShippingCollections::OfficeId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PaymentSubmissions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentSubmissions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentSubmissions::OfficeId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentSubmissions::SubmittedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentSubmissions::OrderIds).json().not_null())
                        .col(
                            ColumnDef::new(PaymentSubmissions::TotalAmountSubmitted)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentSubmissions::ExpectedAmount)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentSubmissions::Discrepancy)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentSubmissions::AdjustedAmount)
                                .decimal()
                                .null(),
                        )
                        .col(ColumnDef::new(PaymentSubmissions::Status).string().not_null())
                        .col(ColumnDef::new(PaymentSubmissions::Notes).string().null())
                        .col(
                            ColumnDef::new(PaymentSubmissions::ReconciliationNotes)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentSubmissions::ReconciledBy)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentSubmissions::ReconciledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentSubmissions::SubmittedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentSubmissions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_submissions_office_status")
                        .table(PaymentSubmissions::Table)
                        .col(PaymentSubmissions::OfficeId)
                        .col(PaymentSubmissions::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PaymentSubmissions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ShippingCollections::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ShippingCollections {
        Table,
        Id,
        OrderId,
        AgentId,
        OfficeId,
        AmountCollected,
        ExpectedAmount,
        Discrepancy,
        PaymentSubmissionId,
        CollectedAt,
    }

    #[derive(DeriveIden)]
    enum PaymentSubmissions {
        Table,
        Id,
        OfficeId,
        SubmittedBy,
        OrderIds,
        TotalAmountSubmitted,
        ExpectedAmount,
        Discrepancy,
        AdjustedAmount,
        Status,
        Notes,
        ReconciliationNotes,
        ReconciledBy,
        ReconciledAt,
        SubmittedAt,
        UpdatedAt,
    }
}

mod m20240101_000008_create_transactions_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000008_create_transactions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Transactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Transactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::Kind).string().not_null())
                        .col(ColumnDef::new(Transactions::Purpose).string().not_null())
                        .col(ColumnDef::new(Transactions::Amount).decimal().not_null())
                        .col(ColumnDef::new(Transactions::OrderId).uuid().null())
                        .col(ColumnDef::new(Transactions::OfficeId).uuid().null())
                        .col(
                            ColumnDef::new(Transactions::PaymentSubmissionId)
                                .uuid()
                                .null(),
                        )
                        .col(ColumnDef::new(Transactions::Status).string().not_null())
                        .col(ColumnDef::new(Transactions::Description).string().null())
                        .col(ColumnDef::new(Transactions::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(Transactions::ResolvedBy).uuid().null())
                        .col(
                            ColumnDef::new(Transactions::ResolvedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transactions_submission")
                        .table(Transactions::Table)
                        .col(Transactions::PaymentSubmissionId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transactions_office")
                        .table(Transactions::Table)
                        .col(Transactions::OfficeId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Transactions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Transactions {
        Table,
        Id,
        Kind,
        Purpose,
        Amount,
        OrderId,
        OfficeId,
        PaymentSubmissionId,
        Status,
        Description,
        CreatedBy,
        ResolvedBy,
        ResolvedAt,
        CreatedAt,
    }
}
