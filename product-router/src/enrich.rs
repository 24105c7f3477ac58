use catalog::types::{EnrichedProduct, ProductRecord, ShopId, ShopMapping};

/// Annotates `products` with their resolved shop.
///
/// Without `target_shop` every product is kept and annotated when the mapping
/// knows its shop. With `target_shop` only products mapped to exactly that
/// shop are kept; unresolved products never match. Input order is preserved.
pub fn apply(
    products: Vec<ProductRecord>,
    mapping: &ShopMapping,
    target_shop: Option<ShopId>,
) -> Vec<EnrichedProduct> {
    products
        .into_iter()
        .filter_map(|product| {
            let shop_id = mapping.get(product.id);
            match target_shop {
                Some(target) if shop_id != Some(target) => None,
                _ => Some(EnrichedProduct::new(product, shop_id)),
            }
        })
        .collect()
}
