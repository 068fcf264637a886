use crate::mpris::MprisHandle;
use crate::state::PlayerState;

pub fn update_mpris(mpris: &MprisHandle, view: &PlayerState) {
    mpris.set_track_metadata(view.current_index, view.current_track());
    mpris.set_playback(view.playback());
    mpris.set_repeat(view.repeat_mode);
}
