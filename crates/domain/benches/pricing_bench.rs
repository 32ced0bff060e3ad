use criterion::{Criterion, criterion_group, criterion_main};
use domain::pricing::{
    GroupPromo, cart_totals, normalize_quantity, price_line, summarize_vendor_group,
};
use domain::{
    CartItem, CartItemId, CartItemStatus, Money, ProductId, PromoKind, StoreId, VendorPromo,
    VolumeTier,
};

fn tiers() -> Vec<VolumeTier> {
    (1..=8)
        .map(|i| VolumeTier {
            min_qty: i * 10,
            unit_price: Money::from_cents(1000 - i64::from(i) * 25),
        })
        .collect()
}

fn make_items(vendor_id: StoreId, count: usize) -> Vec<CartItem> {
    let tiers = tiers();
    (0..count)
        .map(|i| {
            let (quantity, warnings) = normalize_quantity(i as u32 % 50, 5, Some(60));
            let price = price_line(Money::from_cents(1000), &tiers, quantity);
            CartItem {
                id: CartItemId::new(),
                product_id: ProductId::new(),
                vendor_id,
                product_name: format!("Product {i}"),
                requested_qty: i as u32 % 50,
                quantity,
                moq: 5,
                max_qty: Some(60),
                base_price: Money::from_cents(1000),
                unit_price: price.unit_price,
                discount: price.discount,
                subtotal: price.subtotal,
                status: CartItemStatus::Ok,
                warnings,
            }
        })
        .collect()
}

fn bench_price_line(c: &mut Criterion) {
    let tiers = tiers();

    c.bench_function("pricing/price_line", |b| {
        b.iter(|| {
            for qty in 1..100 {
                std::hint::black_box(price_line(Money::from_cents(1000), &tiers, qty));
            }
        });
    });
}

fn bench_vendor_groups(c: &mut Criterion) {
    let vendors: Vec<StoreId> = (0..10).map(|_| StoreId::new()).collect();
    let items: Vec<Vec<CartItem>> = vendors.iter().map(|v| make_items(*v, 20)).collect();
    let promo = VendorPromo {
        code: "BULK".to_string(),
        vendor_id: vendors[0],
        kind: PromoKind::PercentOff { basis_points: 1000 },
        min_subtotal: Money::zero(),
    };

    c.bench_function("pricing/summarize_10_vendors_x_20_items", |b| {
        b.iter(|| {
            let groups: Vec<_> = vendors
                .iter()
                .zip(&items)
                .map(|(vendor, items)| {
                    let refs: Vec<&CartItem> = items.iter().collect();
                    let group_promo = (*vendor == promo.vendor_id).then_some(GroupPromo {
                        code: "BULK",
                        promo: Some(&promo),
                    });
                    summarize_vendor_group(*vendor, &refs, group_promo)
                })
                .collect();
            std::hint::black_box(cart_totals(&groups));
        });
    });
}

criterion_group!(benches, bench_price_line, bench_vendor_groups);
criterion_main!(benches);
