/// Decimal precision used when persisting money amounts
pub const DECIMAL_PRECISION: u32 = 6;

/// Default number of rules processed concurrently within one sweep
pub const DEFAULT_SWEEP_CONCURRENCY: usize = 4;

// Frequency codes as stored
pub const FREQUENCY_DAILY: &str = "DAILY";
pub const FREQUENCY_WEEKLY: &str = "WEEKLY";
pub const FREQUENCY_MONTHLY: &str = "MONTHLY";
pub const FREQUENCY_YEARLY: &str = "YEARLY";

// Transaction type codes as stored
pub const TRANSACTION_TYPE_INCOME: &str = "INCOME";
pub const TRANSACTION_TYPE_EXPENSE: &str = "EXPENSE";

// Budget status codes as stored
pub const BUDGET_STATUS_ACTIVE: &str = "ACTIVE";
pub const BUDGET_STATUS_COMPLETED: &str = "COMPLETED";
pub const BUDGET_STATUS_CANCELLED: &str = "CANCELLED";
