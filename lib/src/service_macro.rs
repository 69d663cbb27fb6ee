//! Declarative macro for kernel collaborator interfaces.
//!
//! ```rust,ignore
//! define_service! {
//!     console => ConsoleServices {
//!         putc(byte: u8);
//!     }
//! }
//! ```
//!
//! expands to:
//! - `pub struct ConsoleServices { pub putc: fn(u8) }`
//! - `pub fn register_console_services(&'static ConsoleServices)`
//! - `pub fn is_console_initialized() -> bool`
//! - `pub fn console_services() -> Option<&'static ConsoleServices>`
//! - one wrapper per method that returns `None` while nothing is registered

#[macro_export]
macro_rules! define_service {
    (
        $(#[$svc_meta:meta])*
        $svc_name:ident => $struct_name:ident {
            $(
                $(#[$method_meta:meta])*
                $method_name:ident($($arg_name:ident : $arg_ty:ty),* $(,)?) $(-> $ret_ty:ty)?
            );* $(;)?
        }
    ) => {
        $(#[$svc_meta])*
        pub struct $struct_name {
            $(
                $(#[$method_meta])*
                pub $method_name: fn($($arg_ty),*) $(-> $ret_ty)?,
            )*
        }

        $crate::paste::paste! {
            static [<$svc_name:upper>]: $crate::ServiceCell<$struct_name> =
                $crate::ServiceCell::new(stringify!($svc_name));

            pub fn [<register_ $svc_name _services>](services: &'static $struct_name) {
                [<$svc_name:upper>].register(services);
            }

            #[inline]
            pub fn [<is_ $svc_name _initialized>]() -> bool {
                [<$svc_name:upper>].is_initialized()
            }

            #[inline(always)]
            pub fn [<$svc_name _services>]() -> Option<&'static $struct_name> {
                [<$svc_name:upper>].try_get()
            }

            $(
                #[inline(always)]
                pub fn $method_name($($arg_name: $arg_ty),*) -> Option<$crate::define_service!(@ret $($ret_ty)?)> {
                    [<$svc_name _services>]().map(|svc| (svc.$method_name)($($arg_name),*))
                }
            )*
        }
    };

    (@ret) => { () };
    (@ret $ret_ty:ty) => { $ret_ty };
}
