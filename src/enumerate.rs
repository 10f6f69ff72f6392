use crate::grid::Zone;
use crate::scale::note_name;
use crate::session::MemoryView;

pub fn midi() -> anyhow::Result<()> {
    println!("=== MIDI Input Devices ===");
    let midi_in = midir::MidiInput::new("padseq-enumerate")?;
    let ports = midi_in.ports();
    if ports.is_empty() {
        println!("  (none found)");
    }
    for port in &ports {
        let name = midi_in.port_name(port).unwrap_or_else(|_| "Unknown".into());
        println!("  {name}");
    }

    println!("=== MIDI Output Devices ===");
    let midi_out = midir::MidiOutput::new("padseq-enumerate")?;
    let ports = midi_out.ports();
    if ports.is_empty() {
        println!("  (none found)");
    }
    for port in &ports {
        let name = midi_out.port_name(port).unwrap_or_else(|_| "Unknown".into());
        println!("  {name}");
    }
    Ok(())
}

/// Print every pad of the view's grid with its zone, coordinates and role.
pub fn pads(view: &MemoryView) {
    let layout = view.layout();
    println!(
        "=== {} view: {}x{} grid ===",
        view.kind().name(),
        layout.columns(),
        layout.total_rows()
    );
    println!("  {:>4}  {:<9}  {:>3}  {:>3}  {}", "pad", "zone", "col", "row", "role");
    for index in 0..layout.pad_count() {
        let Some(pos) = layout.position(index) else {
            continue;
        };
        let role = match pos.zone {
            Zone::Play => {
                let note = view.note_for_pad(index).map_or_else(|| "-".into(), note_name);
                match layout.play_index(pos) {
                    Some(key) => format!("key {key} {note}"),
                    None => note,
                }
            }
            Zone::Sequencer => layout
                .sequencer_step(pos)
                .map_or_else(String::new, |step| format!("step {step}")),
            Zone::Loop => layout
                .loop_page(pos)
                .map_or_else(String::new, |page| format!("page {page}")),
        };
        println!(
            "  {index:>4}  {:<9}  {:>3}  {:>3}  {role}",
            pos.zone.name(),
            pos.col,
            pos.row
        );
    }
}
