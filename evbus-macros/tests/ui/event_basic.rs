use evbus::Event;

#[derive(Debug, Clone, Event)]
struct OrderCreated {
    id: String,
}

#[derive(Debug, Event)]
#[event(name = "order.cancelled")]
struct OrderCancelled;

fn main() {
    assert_eq!(<OrderCreated as Event>::NAME, "OrderCreated");
    assert_eq!(<OrderCancelled as Event>::NAME, "order.cancelled");

    let _ = OrderCreated { id: "X1".into() }.id;
}
