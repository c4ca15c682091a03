//! Canned workspace used by harness fixtures and tests.

use super::{ResourceType, Workspace};

/// Two entity sets with a one-to-many association.
///
/// `Customer` carries a `Version` concurrency token so ETag scenarios are
/// exercisable; `Orders` is paged so next-link scenarios are exercisable.
pub fn customers_orders() -> Workspace {
    Workspace::builder("customers_orders")
        .resource_type(
            ResourceType::new("Customer")
                .key("CustomerId")
                .property("CompanyName")
                .concurrency_property("Version")
                .navigation("Orders", "Orders", true),
        )
        .resource_type(
            ResourceType::new("Order")
                .key("OrderId")
                .property("Total")
                .navigation("Customer", "Customers", false),
        )
        .set("Customers", "Customer")
        .paged_set("Orders", "Order", 2)
        .build()
        .expect("sample workspace is valid")
}
