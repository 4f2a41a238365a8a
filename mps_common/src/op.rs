/// Implements the standard arithmetic operator traits for a single-field tuple struct.
///
/// Usage:
/// * `op!(binary Money, Add, add)` implements `Add` for owned and borrowed operands.
/// * `op!(inplace Money, AddAssign, add_assign)` implements the in-place variant.
/// * `op!(unary Money, Neg, neg)` implements a unary operator.
#[macro_export]
macro_rules! op {
    (binary $ty:ty, $trait:ident, $method:ident) => {
        impl $trait for $ty {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self(self.0.$method(rhs.0))
            }
        }

        impl<'a> $trait<&'a $ty> for $ty {
            type Output = $ty;

            fn $method(self, rhs: &'a $ty) -> Self::Output {
                <$ty>::from(self.0.$method(rhs.0))
            }
        }

        impl<'a> $trait<$ty> for &'a $ty {
            type Output = $ty;

            fn $method(self, rhs: $ty) -> Self::Output {
                <$ty>::from(self.0.$method(rhs.0))
            }
        }

        impl<'a, 'b> $trait<&'b $ty> for &'a $ty {
            type Output = $ty;

            fn $method(self, rhs: &'b $ty) -> Self::Output {
                <$ty>::from(self.0.$method(rhs.0))
            }
        }
    };

    (inplace $ty:ty, $trait:ident, $method:ident) => {
        impl $trait for $ty {
            fn $method(&mut self, rhs: Self) {
                self.0.$method(rhs.0)
            }
        }
    };

    (unary $ty:ty, $trait:ident, $method:ident) => {
        impl $trait for $ty {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self(self.0.$method())
            }
        }
    };
}
