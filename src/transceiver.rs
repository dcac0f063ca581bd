//! Direction control for half-duplex serial links.
//!
//! Switching direction always follows the same order: silence the interrupt of
//! the opposite direction, drive the DE/RE lines, then enable the interrupt of
//! the requested direction.

use log::debug;

use crate::error::{ModbusError, ModbusResult};
use crate::hal::{SerialDevice, SerialLink};

pub(crate) struct Transceiver {
    link: SerialLink,
    full_duplex: bool,
}

impl Transceiver {
    pub(crate) fn new(link: SerialLink, full_duplex: bool) -> Self {
        Self { link, full_duplex }
    }

    pub(crate) fn uart(&self) -> &dyn SerialDevice {
        self.link.uart.as_ref()
    }

    /// Verify readiness and put the direction lines in their idle state
    ///
    /// Idle is listening: DE deasserted, RE asserted.
    pub(crate) fn init(&self) -> ModbusResult<()> {
        if !self.link.uart.is_ready() {
            return Err(ModbusError::line_not_ready("UART device is not ready"));
        }
        if let Some(de) = &self.link.de {
            if !de.is_ready() {
                return Err(ModbusError::line_not_ready("DE line is not ready"));
            }
            de.configure_as_output(false)?;
        }
        if let Some(re) = &self.link.re {
            if !re.is_ready() {
                return Err(ModbusError::line_not_ready("RE line is not ready"));
            }
            re.configure_as_output(true)?;
        }
        Ok(())
    }

    /// Switch the link to transmit and unmask the TX interrupt
    pub(crate) fn enable_transmit(&self) {
        let uart = self.uart();
        if !self.full_duplex {
            uart.disable_rx_interrupt();
            if let Some(re) = &self.link.re {
                re.set_level(false);
            }
        }
        if let Some(de) = &self.link.de {
            de.set_level(true);
        }
        debug!("Transceiver switched to transmit");
        uart.enable_tx_interrupt();
    }

    /// Switch the link to receive and unmask the RX interrupt
    pub(crate) fn enable_receive(&self) {
        let uart = self.uart();
        uart.disable_tx_interrupt();
        if let Some(de) = &self.link.de {
            de.set_level(false);
        }
        if let Some(re) = &self.link.re {
            re.set_level(true);
        }
        debug!("Transceiver switched to receive");
        uart.enable_rx_interrupt();
    }

    /// Mask RX while a captured frame is decoded
    pub(crate) fn disable_receive(&self) {
        self.uart().disable_rx_interrupt();
        if let Some(re) = &self.link.re {
            re.set_level(false);
        }
    }

    /// Mask both interrupts and release the bus
    pub(crate) fn shutdown(&self) {
        let uart = self.uart();
        uart.disable_tx_interrupt();
        uart.disable_rx_interrupt();
        if let Some(de) = &self.link.de {
            de.set_level(false);
        }
        if let Some(re) = &self.link.re {
            re.set_level(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{IrqCallback, OutputLine};
    use crate::protocol::LineConfig;
    use std::sync::{Arc, Mutex};

    type Journal = Arc<Mutex<Vec<String>>>;

    struct JournalUart {
        journal: Journal,
        ready: bool,
    }

    impl SerialDevice for JournalUart {
        fn is_ready(&self) -> bool {
            self.ready
        }
        fn configure(&self, _line: &LineConfig) -> ModbusResult<()> {
            Ok(())
        }
        fn set_irq_callback(&self, _callback: Option<IrqCallback>) {}
        fn enable_rx_interrupt(&self) {
            self.journal.lock().unwrap().push("rx_on".into());
        }
        fn disable_rx_interrupt(&self) {
            self.journal.lock().unwrap().push("rx_off".into());
        }
        fn enable_tx_interrupt(&self) {
            self.journal.lock().unwrap().push("tx_on".into());
        }
        fn disable_tx_interrupt(&self) {
            self.journal.lock().unwrap().push("tx_off".into());
        }
        fn rx_ready(&self) -> bool {
            false
        }
        fn tx_ready(&self) -> bool {
            false
        }
        fn fifo_read(&self, _buf: &mut [u8]) -> usize {
            0
        }
        fn fifo_fill(&self, _data: &[u8]) -> usize {
            0
        }
    }

    struct JournalLine {
        name: &'static str,
        journal: Journal,
    }

    impl OutputLine for JournalLine {
        fn configure_as_output(&self, asserted: bool) -> ModbusResult<()> {
            self.set_level(asserted);
            Ok(())
        }
        fn set_level(&self, asserted: bool) {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}={}", self.name, asserted as u8));
        }
    }

    fn transceiver(full_duplex: bool) -> (Transceiver, Journal) {
        let journal: Journal = Arc::default();
        let link = SerialLink::new(Arc::new(JournalUart {
            journal: journal.clone(),
            ready: true,
        }))
        .with_de(Arc::new(JournalLine {
            name: "de",
            journal: journal.clone(),
        }))
        .with_re(Arc::new(JournalLine {
            name: "re",
            journal: journal.clone(),
        }));
        (Transceiver::new(link, full_duplex), journal)
    }

    fn drain(journal: &Journal) -> Vec<String> {
        std::mem::take(&mut *journal.lock().unwrap())
    }

    #[test]
    fn test_init_sets_idle_levels() {
        let (t, journal) = transceiver(false);
        t.init().unwrap();
        assert_eq!(drain(&journal), vec!["de=0", "re=1"]);
    }

    #[test]
    fn test_direction_switch_order() {
        let (t, journal) = transceiver(false);

        t.enable_transmit();
        assert_eq!(drain(&journal), vec!["rx_off", "re=0", "de=1", "tx_on"]);

        t.enable_receive();
        assert_eq!(drain(&journal), vec!["tx_off", "de=0", "re=1", "rx_on"]);
    }

    #[test]
    fn test_full_duplex_keeps_receiver_on() {
        let (t, journal) = transceiver(true);
        t.enable_transmit();
        assert_eq!(drain(&journal), vec!["de=1", "tx_on"]);
    }

    #[test]
    fn test_not_ready_uart() {
        let journal: Journal = Arc::default();
        let link = SerialLink::new(Arc::new(JournalUart {
            journal,
            ready: false,
        }));
        let err = Transceiver::new(link, false).init().unwrap_err();
        assert!(matches!(err, ModbusError::LineNotReady { .. }));
    }
}
