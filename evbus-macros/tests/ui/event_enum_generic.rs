use evbus::Event;

#[derive(Event)]
#[event(name = "stock.changed")]
enum StockChanged {
    Increased { sku: String, by: u32 },
    Decreased { sku: String, by: u32 },
}

#[derive(Event)]
struct Changed<T> {
    value: T,
}

fn name_of<E: Event>() -> &'static str {
    E::NAME
}

fn main() {
    assert_eq!(name_of::<StockChanged>(), "stock.changed");
    assert_eq!(name_of::<Changed<u64>>(), "Changed");

    let _ = StockChanged::Increased { sku: "a".into(), by: 1 };
    let _ = StockChanged::Decreased { sku: "a".into(), by: 1 };
    let _ = Changed { value: 1u64 }.value;
}
