//! Order transactions: create, modify, cancel, cancel-all and grouped orders

use super::bounds::ProtocolBounds;
use super::{require_zero, wire, wire_enum, TxHeader, TxKind, TxSpec};
use crate::error::{ValidationError, Violation};
use serde::{Deserialize, Serialize};

wire_enum! {
    pub enum OrderType {
        Limit = 0,
        Market = 1,
        StopLoss = 2,
        StopLossLimit = 3,
        TakeProfit = 4,
        TakeProfitLimit = 5,
        Twap = 6,
    }
}

impl OrderType {
    /// Stop-loss and take-profit variants, which rest until triggered.
    pub fn is_conditional(self) -> bool {
        matches!(
            self,
            OrderType::StopLoss
                | OrderType::StopLossLimit
                | OrderType::TakeProfit
                | OrderType::TakeProfitLimit
        )
    }

    /// Order types priced at the aggressive bound instead of a caller price.
    pub fn is_market_priced(self) -> bool {
        matches!(
            self,
            OrderType::Market | OrderType::StopLoss | OrderType::TakeProfit
        )
    }
}

wire_enum! {
    pub enum TimeInForce {
        ImmediateOrCancel = 0,
        GoodTillTime = 1,
        PostOnly = 2,
    }
}

wire_enum! {
    pub enum CancelAllTimeInForce {
        Immediate = 0,
        Scheduled = 1,
        Abort = 2,
    }
}

wire_enum! {
    pub enum GroupingType {
        OneTriggersTheOther = 1,
        OneCancelsTheOther = 2,
        OneTriggersAOneCancelsTheOther = 3,
    }
}

impl GroupingType {
    /// Exact number of constituent orders the exchange accepts
    pub fn order_count(self) -> usize {
        match self {
            GroupingType::OneTriggersTheOther | GroupingType::OneCancelsTheOther => 2,
            GroupingType::OneTriggersAOneCancelsTheOther => 3,
        }
    }
}

/// A single order. Also used as a constituent of [`CreateGroupedOrders`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub market_index: i16,
    pub client_order_index: i64,
    pub base_amount: i64,
    pub price: u32,
    #[serde(serialize_with = "wire::bool_as_u8", deserialize_with = "wire::bool_from_any")]
    pub is_ask: bool,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    #[serde(serialize_with = "wire::bool_as_u8", deserialize_with = "wire::bool_from_any")]
    pub reduce_only: bool,
    pub trigger_price: u32,
    pub order_expiry: i64,
}

impl CreateOrder {
    pub(crate) fn check(&self, kind: TxKind, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        bounds
            .market_index
            .check(kind, "market_index", self.market_index)?;
        bounds
            .client_order_index
            .check(kind, "client_order_index", self.client_order_index)?;
        bounds
            .base_amount
            .check(kind, "base_amount", self.base_amount)?;
        bounds.order_price.check(kind, "price", self.price)?;

        if self.order_type.is_conditional() {
            if self.trigger_price == 0 {
                return Err(ValidationError::new(kind, "trigger_price", Violation::Required));
            }
            bounds
                .order_price
                .check(kind, "trigger_price", self.trigger_price)?;
            if !self.reduce_only {
                return Err(ValidationError::new(kind, "reduce_only", Violation::MustBeSet));
            }
        } else {
            require_zero(kind, "trigger_price", self.trigger_price)?;
        }

        match (self.order_type, self.time_in_force) {
            (OrderType::Market, TimeInForce::ImmediateOrCancel) => {}
            (OrderType::Market, other) => {
                return Err(ValidationError::new(
                    kind,
                    "time_in_force",
                    Violation::Unsupported(format!("market order with {:?}", other)),
                ))
            }
            (OrderType::StopLoss | OrderType::TakeProfit, TimeInForce::PostOnly) => {
                return Err(ValidationError::new(
                    kind,
                    "time_in_force",
                    Violation::Unsupported(format!("{:?} with PostOnly", self.order_type)),
                ))
            }
            (OrderType::Twap, tif) if tif != TimeInForce::GoodTillTime => {
                return Err(ValidationError::new(
                    kind,
                    "time_in_force",
                    Violation::Unsupported(format!("Twap with {:?}", tif)),
                ))
            }
            _ => {}
        }

        let needs_expiry = self.order_type.is_conditional()
            || self.time_in_force != TimeInForce::ImmediateOrCancel;
        if needs_expiry {
            if self.order_expiry == 0 {
                return Err(ValidationError::new(kind, "order_expiry", Violation::Required));
            }
            bounds
                .timestamp
                .check(kind, "order_expiry", self.order_expiry)
        } else {
            require_zero(kind, "order_expiry", self.order_expiry)
        }
    }
}

impl TxSpec for CreateOrder {
    const KIND: TxKind = TxKind::CreateOrder;

    fn validate(&self, _header: &TxHeader, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        self.check(Self::KIND, bounds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyOrder {
    pub market_index: i16,
    pub index: i64,
    pub base_amount: i64,
    pub price: u32,
    pub trigger_price: u32,
}

impl TxSpec for ModifyOrder {
    const KIND: TxKind = TxKind::ModifyOrder;

    fn validate(&self, _header: &TxHeader, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        let kind = Self::KIND;
        bounds
            .market_index
            .check(kind, "market_index", self.market_index)?;
        bounds.order_index.check(kind, "index", self.index)?;
        bounds
            .base_amount
            .check(kind, "base_amount", self.base_amount)?;
        bounds.order_price.check(kind, "price", self.price)?;
        // Zero keeps a non-conditional order non-conditional.
        if self.trigger_price != 0 {
            bounds
                .order_price
                .check(kind, "trigger_price", self.trigger_price)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub market_index: i16,
    pub index: i64,
}

impl TxSpec for CancelOrder {
    const KIND: TxKind = TxKind::CancelOrder;

    fn validate(&self, _header: &TxHeader, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        bounds
            .market_index
            .check(Self::KIND, "market_index", self.market_index)?;
        bounds.order_index.check(Self::KIND, "index", self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelAllOrders {
    pub time_in_force: CancelAllTimeInForce,
    /// Scheduled cancel time; zero unless `time_in_force` is `Scheduled`
    pub time: i64,
}

impl TxSpec for CancelAllOrders {
    const KIND: TxKind = TxKind::CancelAllOrders;

    fn validate(&self, _header: &TxHeader, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        match self.time_in_force {
            CancelAllTimeInForce::Scheduled => {
                if self.time == 0 {
                    return Err(ValidationError::new(Self::KIND, "time", Violation::Required));
                }
                bounds.timestamp.check(Self::KIND, "time", self.time)
            }
            CancelAllTimeInForce::Immediate | CancelAllTimeInForce::Abort => {
                require_zero(Self::KIND, "time", self.time)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGroupedOrders {
    pub grouping_type: GroupingType,
    pub orders: Vec<CreateOrder>,
}

impl TxSpec for CreateGroupedOrders {
    const KIND: TxKind = TxKind::CreateGroupedOrders;

    fn validate(&self, _header: &TxHeader, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        let kind = Self::KIND;
        let count = self.orders.len();
        if count < bounds.min_grouped_orders || count > bounds.max_grouped_orders {
            return Err(ValidationError::new(
                kind,
                "orders",
                Violation::InvalidLength {
                    expected: format!(
                        "{}..={}",
                        bounds.min_grouped_orders, bounds.max_grouped_orders
                    ),
                    actual: count,
                },
            ));
        }
        let expected = self.grouping_type.order_count();
        if count != expected {
            return Err(ValidationError::new(
                kind,
                "orders",
                Violation::InvalidLength {
                    expected: expected.to_string(),
                    actual: count,
                },
            ));
        }

        let market = self.orders[0].market_index;
        for order in &self.orders {
            if order.market_index != market {
                return Err(ValidationError::new(
                    kind,
                    "market_index",
                    Violation::Mismatch(format!(
                        "grouped orders span markets {} and {}",
                        market, order.market_index
                    )),
                ));
            }
            order.check(kind, bounds)?;
        }
        Ok(())
    }
}

/// Leading signed integer of `raw`, ignoring anything after the digits:
/// `"3024.51"` reads as `3024`.
fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let sign_len = usize::from(trimmed.starts_with(['+', '-']));
    let digits = trimmed[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    trimmed[..sign_len + digits].parse().ok()
}

/// Apply `slippage_bps` to a reference price, clamped to the price bounds.
/// Buys move the price up, sells move it down. Only the integer part of the
/// reference is used.
pub fn slippage_price(
    reference_price: &str,
    slippage_bps: u32,
    is_buy: bool,
    bounds: &ProtocolBounds,
) -> Result<u32, ValidationError> {
    let reference = leading_integer(reference_price).ok_or_else(|| {
        ValidationError::new(
            TxKind::CreateOrder,
            "reference_price",
            Violation::Unsupported(format!("no integer price in {:?}", reference_price)),
        )
    })?;
    if reference <= 0 {
        return Err(ValidationError::new(
            TxKind::CreateOrder,
            "reference_price",
            Violation::Required,
        ));
    }

    let adjustment = (reference as i128 * slippage_bps as i128) / 10_000;
    let shifted = if is_buy {
        reference as i128 + adjustment
    } else {
        reference as i128 - adjustment
    };
    let clamped = shifted.clamp(
        bounds.min_order_price() as i128,
        bounds.max_order_price() as i128,
    );
    Ok(clamped as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> TxHeader {
        TxHeader {
            account_index: 1,
            api_key_index: 0,
            expired_at: 1_700_000_000_000,
            nonce: 0,
        }
    }

    fn limit() -> CreateOrder {
        CreateOrder {
            market_index: 0,
            client_order_index: 1,
            base_amount: 1_000_000,
            price: 3_000_000_000,
            is_ask: false,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::GoodTillTime,
            reduce_only: false,
            trigger_price: 0,
            order_expiry: 1_700_000_600_000,
        }
    }

    fn validate(order: &CreateOrder) -> Result<(), ValidationError> {
        order.validate(&header(), &ProtocolBounds::default())
    }

    #[test]
    fn accepts_good_till_time_limit() {
        validate(&limit()).unwrap();
    }

    #[test]
    fn rejects_zero_price() {
        let order = CreateOrder {
            price: 0,
            ..limit()
        };
        let err = validate(&order).unwrap_err();
        assert_eq!(err.field, "price");
    }

    #[test]
    fn conditional_orders_need_trigger_and_reduce_only() {
        let stop = CreateOrder {
            order_type: OrderType::StopLossLimit,
            reduce_only: true,
            trigger_price: 0,
            ..limit()
        };
        assert_eq!(validate(&stop).unwrap_err().field, "trigger_price");

        let stop = CreateOrder {
            trigger_price: 2_800_000_000,
            reduce_only: false,
            ..stop
        };
        let err = validate(&stop).unwrap_err();
        assert_eq!(err.field, "reduce_only");
        assert_eq!(err.violation, Violation::MustBeSet);
    }

    #[test]
    fn plain_limit_rejects_trigger_price() {
        let order = CreateOrder {
            trigger_price: 5,
            ..limit()
        };
        assert_eq!(validate(&order).unwrap_err().violation, Violation::MustBeZero);
    }

    #[test]
    fn market_order_must_be_ioc_without_expiry() {
        let market = CreateOrder {
            order_type: OrderType::Market,
            time_in_force: TimeInForce::ImmediateOrCancel,
            order_expiry: 0,
            ..limit()
        };
        validate(&market).unwrap();

        let gtt = CreateOrder {
            time_in_force: TimeInForce::GoodTillTime,
            ..market.clone()
        };
        assert_eq!(validate(&gtt).unwrap_err().field, "time_in_force");

        let with_expiry = CreateOrder {
            order_expiry: 1,
            ..market
        };
        assert_eq!(validate(&with_expiry).unwrap_err().field, "order_expiry");
    }

    #[test]
    fn scheduled_cancel_all_needs_time() {
        let bounds = ProtocolBounds::default();
        let scheduled = CancelAllOrders {
            time_in_force: CancelAllTimeInForce::Scheduled,
            time: 0,
        };
        assert_eq!(
            scheduled.validate(&header(), &bounds).unwrap_err().field,
            "time"
        );

        let immediate = CancelAllOrders {
            time_in_force: CancelAllTimeInForce::Immediate,
            time: 0,
        };
        immediate.validate(&header(), &bounds).unwrap();
    }

    #[test]
    fn grouped_orders_share_a_market() {
        let bounds = ProtocolBounds::default();
        let take_profit = CreateOrder {
            is_ask: true,
            reduce_only: true,
            ..limit()
        };
        let stop_loss = CreateOrder {
            is_ask: true,
            order_type: OrderType::StopLoss,
            reduce_only: true,
            trigger_price: 2_800_000_000,
            price: 1,
            ..limit()
        };
        let group = CreateGroupedOrders {
            grouping_type: GroupingType::OneCancelsTheOther,
            orders: vec![take_profit.clone(), stop_loss.clone()],
        };
        group.validate(&header(), &bounds).unwrap();

        let split = CreateGroupedOrders {
            orders: vec![
                take_profit.clone(),
                CreateOrder {
                    market_index: 1,
                    ..stop_loss
                },
            ],
            ..group.clone()
        };
        assert!(matches!(
            split.validate(&header(), &bounds).unwrap_err().violation,
            Violation::Mismatch(_)
        ));

        let single = CreateGroupedOrders {
            orders: vec![take_profit],
            ..group
        };
        assert_eq!(
            single.validate(&header(), &bounds).unwrap_err().field,
            "orders"
        );
    }

    #[test]
    fn slippage_moves_price_toward_aggression() {
        let bounds = ProtocolBounds::default();
        assert_eq!(slippage_price("300000", 100, true, &bounds).unwrap(), 303_000);
        assert_eq!(slippage_price("300000", 100, false, &bounds).unwrap(), 297_000);
        assert_eq!(slippage_price("2", 10_000, false, &bounds).unwrap(), 1);
        assert_eq!(
            slippage_price("4294967295", 500, true, &bounds).unwrap(),
            u32::MAX
        );
        assert!(slippage_price("best", 100, true, &bounds).is_err());
        assert!(slippage_price("-5", 100, true, &bounds).is_err());
    }

    #[test]
    fn slippage_reads_integer_part_of_decimal_price() {
        let bounds = ProtocolBounds::default();
        assert_eq!(slippage_price("3024.51", 100, true, &bounds).unwrap(), 3_054);
        assert_eq!(slippage_price(" 3024.51", 100, false, &bounds).unwrap(), 2_994);
        assert_eq!(leading_integer("+17x"), Some(17));
        assert_eq!(leading_integer(".5"), None);
    }
}
