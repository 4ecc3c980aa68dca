use brg_common::Euros;
use sqlx::SqliteConnection;

/// The list price of a product, if the product exists. The catalog is consumed, not owned: rows are maintained by
/// the storefront admin, and an unknown product simply yields no catalog price.
pub async fn fetch_product_price(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Euros>, sqlx::Error> {
    let price: Option<Euros> =
        sqlx::query_scalar("SELECT price FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(price)
}

/// Test and provisioning helper.
pub async fn upsert_product(
    product_id: i64,
    name: &str,
    price: Euros,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO products (id, name, price) VALUES ($1, $2, $3) ON CONFLICT (id) DO UPDATE SET name = $2, price \
         = $3",
    )
    .bind(product_id)
    .bind(name)
    .bind(price)
    .execute(conn)
    .await?;
    Ok(())
}
