//! Character output supplied by the boot collaborator.
//!
//! The core never talks to a UART directly; boot registers a `putc` and
//! klog routes through it. Nothing is printed before registration.

crate::define_service! {
    console => ConsoleServices {
        putc(byte: u8);
    }
}

pub fn puts(text: &str) {
    let Some(svc) = console_services() else {
        return;
    };
    for byte in text.bytes() {
        (svc.putc)(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_dropped_until_registered() {
        // No test in this crate registers a console.
        assert!(!is_console_initialized());
        assert_eq!(putc(b'x'), None);
        puts("discarded");
    }
}
