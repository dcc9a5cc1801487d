use sea_orm::sea_query::{ArrayType, ColumnType, Nullable, Value, ValueType, ValueTypeErr};
use sea_orm::{ColIdx, DbErr, QueryResult, TryFromU64, TryGetError, TryGetable};
use serde::{Deserialize, Serialize};

/// Declares an `INTEGER` primary key newtype that sea-orm can read, write and compare.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            Debug,
            Default,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for Value {
            fn from(id: $name) -> Self {
                Value::Int(Some(id.0))
            }
        }

        impl TryGetable for $name {
            fn try_get_by<I: ColIdx>(res: &QueryResult, index: I) -> Result<Self, TryGetError> {
                i32::try_get_by(res, index).map(Self)
            }
        }

        impl ValueType for $name {
            fn try_from(value: Value) -> Result<Self, ValueTypeErr> {
                stored_id(value).map(Self)
            }

            fn type_name() -> String {
                stringify!($name).to_string()
            }

            fn array_type() -> ArrayType {
                ArrayType::Int
            }

            fn column_type() -> ColumnType {
                ColumnType::Integer
            }
        }

        impl TryFromU64 for $name {
            fn try_from_u64(n: u64) -> Result<Self, DbErr> {
                <i32 as TryFrom<u64>>::try_from(n).map(Self).map_err(|_| {
                    DbErr::ConvertFromU64(concat!("id out of range for ", stringify!($name)))
                })
            }
        }

        impl Nullable for $name {
            fn null() -> Value {
                Value::Int(None)
            }
        }
    };
}

/// Postgres hands `SERIAL` ids back as `Int`; sqlite's `INTEGER PRIMARY KEY` comes back as
/// `BigInt`.
fn stored_id(value: Value) -> Result<i32, ValueTypeErr> {
    match value {
        Value::Int(Some(id)) => Ok(id),
        Value::BigInt(Some(id)) => <i32 as TryFrom<_>>::try_from(id).map_err(|_| ValueTypeErr),
        Value::SmallInt(Some(id)) => Ok(id.into()),
        Value::Unsigned(Some(id)) => <i32 as TryFrom<_>>::try_from(id).map_err(|_| ValueTypeErr),
        _ => Err(ValueTypeErr),
    }
}

id_type!(
    /// A row in `plans`.
    PlanId
);
id_type!(
    /// A row in `plan_entitlements`.
    PlanEntitlementId
);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ids_from_stored_values() {
        assert_eq!(<PlanId as ValueType>::try_from(Value::Int(Some(7))).ok(), Some(PlanId(7)));
        assert_eq!(
            <PlanId as ValueType>::try_from(Value::BigInt(Some(7))).ok(),
            Some(PlanId(7))
        );
        assert!(<PlanId as ValueType>::try_from(Value::BigInt(Some(i64::MAX))).is_err());
        assert!(<PlanId as ValueType>::try_from(Value::Int(None)).is_err());

        assert_eq!(PlanEntitlementId::try_from_u64(12).ok(), Some(PlanEntitlementId(12)));
        assert!(PlanId::try_from_u64(u64::MAX).is_err());
        assert_eq!(PlanId(3).to_string(), "3");
        assert_eq!(Value::from(PlanId(3)), Value::Int(Some(3)));
    }
}
